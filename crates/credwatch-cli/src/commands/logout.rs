//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use credwatch_core::traits::TokenStore;

use crate::app;
use crate::config::Config;
use crate::output;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, config: &Config) -> Result<()> {
    app::token_store(config)?
        .clear()
        .context("Failed to remove stored session")?;
    output::success("Stored session removed");
    Ok(())
}
