//! Polling pipeline.
//!
//! Each poll obtains a token, calls one endpoint, and on a rejected token
//! re-authenticates and retries exactly once before transforming the response
//! and handing the result to the dispatcher.

pub mod credits;
pub mod templates;

use std::sync::Arc;

use chrono::TimeDelta;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::dispatch::NotificationDispatcher;
use crate::error::AuthenticationError;
use crate::manager::SessionManager;
use crate::traits::{ApiCaller, Clock, CreditCache};
use crate::types::{CreditReading, TemplateRecord};
use crate::{Error, Result};

pub use credits::CREDITS_ENDPOINT;
pub use templates::TEMPLATES_ENDPOINT;

/// Which account to poll and where.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Dashboard assistant (account) identifier sent with every request.
    pub assistant_id: String,
    pub credits_endpoint: String,
    pub templates_endpoint: String,
    /// How far back a template status change still counts as recent.
    pub template_window: TimeDelta,
}

impl PipelineConfig {
    /// Default endpoints and a four-hour template window.
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            credits_endpoint: CREDITS_ENDPOINT.to_string(),
            templates_endpoint: TEMPLATES_ENDPOINT.to_string(),
            template_window: TimeDelta::hours(4),
        }
    }
}

/// Outcome of one credits poll.
#[derive(Debug, Clone, Serialize)]
pub struct CreditsReport {
    #[serde(flatten)]
    pub reading: CreditReading,
    /// Whether the balance raised an alert.
    pub alerted: bool,
}

/// Outcome of one templates poll.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatesReport {
    /// Every template in the response, normalized.
    pub templates: Vec<TemplateRecord>,
    /// The subset that was disabled within the window and alerted on.
    pub recent_disabled: Vec<TemplateRecord>,
}

/// Polls the credits and templates endpoints on behalf of any trigger.
#[derive(Clone)]
pub struct PollingPipeline {
    session: SessionManager,
    api: Arc<dyn ApiCaller>,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    cache: Option<Arc<dyn CreditCache>>,
    config: PipelineConfig,
}

impl PollingPipeline {
    pub fn new(
        session: SessionManager,
        api: Arc<dyn ApiCaller>,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            session,
            api,
            dispatcher,
            clock,
            cache: None,
            config,
        }
    }

    /// Record every successful credit reading in `cache`.
    pub fn with_credit_cache(mut self, cache: Arc<dyn CreditCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the session manager shared by this pipeline.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Read the credit balance and alert if it is low.
    #[instrument(skip(self))]
    pub async fn poll_credits(&self) -> Result<CreditsReport> {
        let payload = credits::payload(&self.config.assistant_id);
        let response = self.fetch(&self.config.credits_endpoint, &payload).await?;
        let reading = credits::extract(&response, self.clock.now())?;
        info!(credits = reading.credits, "Credit balance read");

        if let Some(cache) = &self.cache
            && let Err(e) = cache.record(&reading)
        {
            warn!(error = %e, "Failed to cache credit reading");
        }

        let alerted = self.dispatcher.credits(&reading).await;
        Ok(CreditsReport { reading, alerted })
    }

    /// Read template statuses and alert on recently disabled ones.
    #[instrument(skip(self))]
    pub async fn poll_templates(&self) -> Result<TemplatesReport> {
        let now = self.clock.now();
        let payload = templates::payload(&self.config.assistant_id, now);
        let response = self
            .fetch(&self.config.templates_endpoint, &payload)
            .await?;

        let normalized = templates::normalize(&response)?;
        let recent = templates::recent_disabled(&normalized, now, self.config.template_window);
        info!(
            scanned = normalized.len(),
            recent = recent.len(),
            "Templates processed"
        );

        self.dispatcher.templates(&recent).await;
        Ok(TemplatesReport {
            templates: normalized,
            recent_disabled: recent,
        })
    }

    /// Call `endpoint`, re-authenticating and retrying once on a rejected token.
    #[instrument(skip(self, payload))]
    async fn fetch(&self, endpoint: &str, payload: &Value) -> Result<Value> {
        let token = self.session.get_token().await?;
        match self.api.call(endpoint, &token, payload).await {
            Err(Error::AuthFailed { .. }) => {
                warn!("Token rejected, re-authenticating and retrying once");
                self.session.invalidate_token(&token);
            }
            other => return other,
        }

        let token = self.session.get_token().await?;
        match self.api.call(endpoint, &token, payload).await {
            Err(Error::AuthFailed { .. }) => {
                warn!("Fresh token rejected as well, giving up for this cycle");
                self.session.invalidate_token(&token);
                Err(AuthenticationError::TokenRejected.into())
            }
            other => other,
        }
    }
}
