//! Login command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use credwatch_core::traits::SystemClock;

use crate::app;
use crate::config::Config;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {}

pub async fn run(_args: LoginArgs, config: &Config) -> Result<()> {
    let session = app::session_manager(config, Arc::new(SystemClock))?;

    eprintln!("{}", "Logging in...".dimmed());
    session.refresh().await.context("Failed to login")?;

    let status = session.status();
    output::success("Logged in successfully");
    println!();
    if let Some(expires_at) = status.expires_at {
        output::field("Expires", &expires_at.to_rfc3339());
    }
    output::field("Stored in", &app::token_store(config)?.path().display().to_string());

    Ok(())
}
