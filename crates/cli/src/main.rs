//! # Commit Insights CLI
//!
//! CI plugin that reports the commits and file changes of a pipeline run.
//!
//! The plugin finds the commit range of the run, either from the last matching
//! Harness pipeline execution or from a Bitbucket push payload, reads the
//! commit history of the checkout and writes an HTML report. The report and its
//! metadata are also exported to the environment file named by `DRONE_OUTPUT`
//! so later pipeline steps can use them.
//!
//! # Commands
//!
//! - `generate` - Generate the report (the default when no command is given)
//!
//! # Examples
//!
//! ```bash
//! # Inside a Harness CI step, everything comes from the environment
//! commit-insights
//!
//! # Explicit settings
//! commit-insights generate --pipeline-id build_pipeline --branch main --commit-id abc123
//! ```

#![deny(missing_docs)]

use std::process::{ExitCode, Termination};

use clap::{Parser, Subcommand};
use tracing::{error, info};

/// Command implementations for the CLI.
mod commands;

/// Configuration management for the CLI.
mod config;

/// Error types specific to the CLI.
mod errors;

use config::GenerateArgs;
use errors::CliError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter.
const LOG_FILTER_VARIABLE: &str = "COMMIT_INSIGHTS_LOG";

/// Command-line interface structure for Commit Insights.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands for the Commit Insights CLI.
#[derive(Subcommand)]
enum Commands {
    /// Generate the commit insights report
    Generate(GenerateArgs),
}

/// Installs the log subscriber. `COMMIT_INSIGHTS_LOG` takes precedence over
/// the verbose flag.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_FILTER_VARIABLE)
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Main entry point for the Commit Insights CLI.
///
/// Exits with a distinct code per failure kind, see [`CliError::exit_code`].
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let args = match cli.command {
        Some(Commands::Generate(args)) => args,
        None => GenerateArgs::default(),
    };

    match commands::generate::execute(args).await {
        Ok(()) => {
            info!("Commit insights finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error generating commit insights: {}", e);
            e.report()
        }
    }
}
