//! Status command implementation.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde_json::json;

use credwatch_core::traits::{CreditCache, TokenStore};
use credwatch_file::FileCreditCache;

use crate::app;
use crate::config::Config;
use crate::output;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let store = app::token_store(config)?;
    let session = store.load();
    let valid = session.as_ref().is_some_and(|s| s.is_valid_at(Utc::now()));
    let latest = FileCreditCache::in_dir(config.data_dir()?).latest();

    if args.json {
        return output::json_pretty(&json!({
            "valid": valid,
            "expiresAt": session.as_ref().map(|s| s.expires_at()),
            "latestCredit": latest,
        }));
    }

    match &session {
        Some(session) => {
            let state = if valid { "valid" } else { "expired" };
            output::field("Session", state);
            output::field("Expires", &session.expires_at().to_rfc3339());
        }
        None => output::field("Session", "none"),
    }
    if let Some(reading) = latest {
        output::field(
            "Last credits",
            &format!("{} at {}", reading.credits, reading.observed_at.to_rfc3339()),
        );
    }
    Ok(())
}
