//! Periodic polling.

use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, instrument, warn};

use credwatch_core::{CreditsReport, PollingPipeline, Result, TemplatesReport};

/// Result of polling both sources once.
#[derive(Debug)]
pub struct Cycle {
    pub credits: Result<CreditsReport>,
    pub templates: Result<TemplatesReport>,
}

impl Cycle {
    pub fn is_success(&self) -> bool {
        self.credits.is_ok() && self.templates.is_ok()
    }
}

/// Poll both sources once, concurrently, on the shared session.
#[instrument(skip(pipeline))]
pub async fn run_cycle(pipeline: &PollingPipeline) -> Cycle {
    let (credits, templates) = tokio::join!(pipeline.poll_credits(), pipeline.poll_templates());

    match &credits {
        Ok(report) => info!(
            credits = report.reading.credits,
            alerted = report.alerted,
            "Credits checked"
        ),
        Err(e) => warn!(kind = e.kind(), error = %e, "Credits check failed"),
    }
    match &templates {
        Ok(report) => info!(
            templates = report.templates.len(),
            alerted = report.recent_disabled.len(),
            "Templates checked"
        ),
        Err(e) => warn!(kind = e.kind(), error = %e, "Templates check failed"),
    }

    Cycle { credits, templates }
}

/// Run a cycle now and then every `every` until the task is dropped.
///
/// Before each cycle a missing or lapsed session is renewed up front, so both
/// sources start from the same token; if that login fails the cycle is
/// skipped. A panicking cycle is logged and does not stop the loop.
pub async fn run(pipeline: PollingPipeline, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(every_secs = every.as_secs(), "Scheduler started");

    loop {
        ticker.tick().await;

        let pipeline = pipeline.clone();
        let cycle = tokio::spawn(async move {
            if !pipeline.session().is_valid() {
                info!("No valid session, logging in before polling");
                if let Err(e) = pipeline.session().get_token().await {
                    error!(error = %e, "Login failed, skipping this cycle");
                    return;
                }
            }
            let cycle = run_cycle(&pipeline).await;
            info!(ok = cycle.is_success(), "Cycle finished");
        });

        if let Err(e) = cycle.await {
            error!(error = %e, "Polling cycle aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeBackend, pipeline};

    #[tokio::test]
    async fn cycle_polls_both_sources_with_one_login() {
        let backend = FakeBackend::new(json!({ "templateCredit": 100 }), json!({ "templates": [] }));
        let (pipeline, logins) = pipeline(backend.clone());

        let cycle = run_cycle(&pipeline).await;

        assert!(cycle.is_success());
        assert_eq!(logins.count(), 1);
        assert_eq!(backend.calls(), 2);
        assert!(cycle.credits.unwrap().alerted);
    }

    #[tokio::test]
    async fn one_failing_source_does_not_hide_the_other() {
        let backend = FakeBackend::new(json!({ "templateCredit": 5000 }), json!({ "oops": true }));
        let (pipeline, _) = pipeline(backend);

        let cycle = run_cycle(&pipeline).await;

        assert!(!cycle.is_success());
        assert!(cycle.credits.is_ok());
        assert_eq!(cycle.templates.unwrap_err().kind(), "transform");
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_runs_at_startup_and_on_each_tick() {
        let backend = FakeBackend::new(json!({ "templateCredit": 5000 }), json!({ "templates": [] }));
        let (pipeline, logins) = pipeline(backend.clone());

        let task = tokio::spawn(run(pipeline, Duration::from_secs(3600)));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.calls(), 2);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(backend.calls(), 4);
        assert_eq!(logins.count(), 1);

        task.abort();
    }
}
