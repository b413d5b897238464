//! Poll command implementation.

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use serde_json::json;

use crate::app::App;
use crate::config::Config;
use crate::output;
use crate::scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    Credits,
    Templates,
    All,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    /// What to poll
    #[arg(value_enum, default_value_t = Source::All)]
    pub source: Source,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: PollArgs, config: &Config) -> Result<()> {
    let app = App::from_config(config)?;
    let pipeline = &app.pipeline;

    let (credits, templates) = match args.source {
        Source::Credits => (Some(pipeline.poll_credits().await), None),
        Source::Templates => (None, Some(pipeline.poll_templates().await)),
        Source::All => {
            let cycle = scheduler::run_cycle(pipeline).await;
            (Some(cycle.credits), Some(cycle.templates))
        }
    };

    let mut failures = 0;
    if args.json {
        let mut body = serde_json::Map::new();
        if let Some(result) = &credits {
            body.insert("credits".into(), result_json(result)?);
        }
        if let Some(result) = &templates {
            body.insert("templates".into(), result_json(result)?);
        }
        output::json_pretty(&body)?;
    }

    if let Some(result) = credits {
        match result {
            Ok(report) if !args.json => output::credits(&report),
            Ok(_) => {}
            Err(e) => {
                failures += 1;
                output::error(&format!("Credits check failed: {e}"));
            }
        }
    }
    if let Some(result) = templates {
        match result {
            Ok(report) if !args.json => output::templates(&report),
            Ok(_) => {}
            Err(e) => {
                failures += 1;
                output::error(&format!("Templates check failed: {e}"));
            }
        }
    }

    if failures > 0 {
        bail!("{failures} check(s) failed");
    }
    Ok(())
}

fn result_json<T: serde::Serialize>(result: &credwatch_core::Result<T>) -> Result<serde_json::Value> {
    Ok(match result {
        Ok(report) => serde_json::to_value(report)?,
        Err(e) => json!({ "error": e.to_string(), "kind": e.kind() }),
    })
}
