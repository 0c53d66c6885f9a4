use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use nbprates::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for nbprates::AppCommand {
    fn from(cmd: Commands) -> nbprates::AppCommand {
        match cmd {
            Commands::Rate { currencies, day } => nbprates::AppCommand::Rate { currencies, day },
            Commands::Previous { currencies, day } => {
                nbprates::AppCommand::Previous { currencies, day }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the rate published on a day
    Rate {
        /// Currency codes, e.g. EUR USD
        #[arg(required = true)]
        currencies: Vec<String>,
        /// Day as YYYY-MM-DD, today when omitted
        #[arg(short, long)]
        day: Option<NaiveDate>,
    },
    /// Show the rate of the last trading day before a day
    Previous {
        /// Currency codes, e.g. EUR USD
        #[arg(required = true)]
        currencies: Vec<String>,
        /// Day as YYYY-MM-DD, today when omitted
        #[arg(short, long)]
        day: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => nbprates::cli::setup::setup().map(|path| {
            println!("Created default configuration at {}", path.display());
        }),
        Some(cmd) => nbprates::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_previous_with_day() {
        let cli = Cli::try_parse_from(["nbp", "previous", "eur", "usd", "--day", "2022-04-18"])
            .unwrap();
        match cli.command {
            Some(Commands::Previous { currencies, day }) => {
                assert_eq!(currencies, vec!["eur", "usd"]);
                assert_eq!(day, NaiveDate::from_ymd_opt(2022, 4, 18));
            }
            _ => panic!("Expected the previous command"),
        }
    }

    #[test]
    fn test_rate_requires_currency() {
        assert!(Cli::try_parse_from(["nbp", "rate"]).is_err());
        assert!(Cli::try_parse_from(["nbp", "rate", "EUR", "--day", "18.04.2022"]).is_err());
    }
}
