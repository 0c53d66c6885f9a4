pub mod nbp;

pub use nbp::NbpFetcher;
