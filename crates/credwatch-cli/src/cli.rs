//! CLI argument definitions.

use clap::Parser;

use crate::commands::Commands;
use crate::config::Config;

/// Watches a messaging dashboard's credit balance and template statuses.
#[derive(Parser, Debug)]
#[command(name = "credwatch")]
#[command(author, version = env!("CREDWATCH_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Commands,
}
