//! Wiring of the concrete collaborators behind the core services.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use credwatch_core::traits::{Clock, CreditCache, Notifier, SystemClock};
use credwatch_core::{NotificationDispatcher, PollingPipeline, SessionManager};
use credwatch_file::{FileCreditCache, FileTokenStore};
use credwatch_http::{HttpApiClient, LogNotifier, WebhookNotifier};

use crate::authenticator::CommandAuthenticator;
use crate::config::Config;

/// Everything a trigger needs: one session shared by both pipelines.
#[derive(Clone)]
pub struct App {
    pub pipeline: PollingPipeline,
    pub credits: Arc<dyn CreditCache>,
}

impl App {
    pub fn from_config(config: &Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let session = session_manager(config, clock.clone())?;

        let api = HttpApiClient::new(config.api()).context("Failed to build API client")?;
        let dispatcher =
            NotificationDispatcher::new(notifier(config)?, clock.clone(), config.dispatch()?);
        let credits: Arc<dyn CreditCache> = Arc::new(FileCreditCache::in_dir(config.data_dir()?));

        let pipeline = PollingPipeline::new(
            session,
            Arc::new(api),
            dispatcher,
            clock,
            config.pipeline()?,
        )
        .with_credit_cache(credits.clone());

        Ok(Self { pipeline, credits })
    }

    pub fn session(&self) -> &SessionManager {
        self.pipeline.session()
    }
}

/// The persisted session store for `config`.
pub fn token_store(config: &Config) -> Result<FileTokenStore> {
    Ok(FileTokenStore::in_dir(config.data_dir()?))
}

/// A session manager logging in through the configured command.
pub fn session_manager(config: &Config, clock: Arc<dyn Clock>) -> Result<SessionManager> {
    let authenticator = CommandAuthenticator::new(
        config.login_command()?,
        config.storage_state()?,
        config.token_cookie.clone(),
    )?;

    Ok(SessionManager::new(
        Arc::new(token_store(config)?),
        Arc::new(authenticator),
        clock,
        config.session(),
    ))
}

fn notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    match config.webhook_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => {
            info!("Alerts go to the configured webhook");
            let notifier = WebhookNotifier::new(url, config.request_timeout())
                .context("Failed to build webhook client")?;
            Ok(Arc::new(notifier))
        }
        None => {
            info!("No webhook configured, alerts are only logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}
