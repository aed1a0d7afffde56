use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use fundsight::core::forecast::DEFAULT_HORIZON_DAYS;
use fundsight::core::log::init_logging;
use fundsight::{AppCommand, CompareArgs};
use std::path::PathBuf;

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

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Search { query, limit } => AppCommand::Search { query, limit },
            Commands::Compare {
                codes,
                from,
                to,
                reference,
                export,
                raw,
            } => AppCommand::Compare(CompareArgs {
                codes,
                from,
                to,
                reference,
                export,
                raw,
            }),
            Commands::Returns { codes } => AppCommand::Returns { codes },
            Commands::Forecast { code, days, weekly } => {
                AppCommand::Forecast { code, days, weekly }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Search the scheme catalog by name or code
    Search {
        query: String,
        /// Maximum number of matches to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Compare funds on a base-100 scale
    Compare {
        /// Scheme codes; defaults to the configured funds
        codes: Vec<String>,
        /// Window start (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Window end (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Base-100 date (YYYY-MM-DD)
        #[arg(long)]
        reference: Option<NaiveDate>,
        /// Write the window to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
        /// Export raw NAVs instead of normalized values
        #[arg(long, requires = "export")]
        raw: bool,
    },
    /// Display trailing and annualised returns
    Returns {
        /// Scheme codes; defaults to the configured funds
        codes: Vec<String>,
    },
    /// Forecast a fund's NAV with a linear trend
    Forecast {
        code: String,
        /// Forecast horizon in days (30 to 180)
        #[arg(short, long, default_value_t = DEFAULT_HORIZON_DAYS)]
        days: u32,
        /// Add a day-of-week effect
        #[arg(long)]
        weekly: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => fundsight::cli::setup::setup_at_path(path),
            None => fundsight::cli::setup::setup(),
        },
        Some(cmd) => fundsight::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
