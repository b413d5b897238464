//! Serve command implementation.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{Result, ensure};
use clap::Args;
use tracing::info;

use crate::app::App;
use crate::config::Config;
use crate::{scheduler, server};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Minutes between scheduled polls
    #[arg(long, env = "POLL_INTERVAL_MINUTES", default_value_t = 60)]
    pub interval_minutes: u64,

    /// Only poll on request; do not run the schedule
    #[arg(long)]
    pub no_schedule: bool,

    /// Shared secret for the cron trigger and forced refresh
    #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
    pub cron_secret: Option<String>,
}

pub async fn run(args: ServeArgs, config: &Config) -> Result<()> {
    ensure!(args.interval_minutes > 0, "Poll interval must be at least one minute");
    let app = App::from_config(config)?;

    let schedule = if args.no_schedule {
        info!("Scheduled polling disabled");
        None
    } else {
        let every = Duration::from_secs(args.interval_minutes * 60);
        Some(tokio::spawn(scheduler::run(app.pipeline.clone(), every)))
    };

    let result = server::serve(app, SocketAddr::new(args.host, args.port), args.cron_secret).await;

    if let Some(schedule) = schedule {
        schedule.abort();
    }
    result
}
