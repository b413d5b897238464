//! In-process doubles for the scheduler and server tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use credwatch_core::error::{ApiError, AuthenticationError};
use credwatch_core::pipeline::{CREDITS_ENDPOINT, TEMPLATES_ENDPOINT};
use credwatch_core::{
    AccessToken, ApiCaller, Authenticator, DispatchConfig, MemoryCreditCache, MemoryTokenStore,
    NotificationDispatcher, PipelineConfig, PollingPipeline, Result, SessionConfig,
    SessionManager, SystemClock,
};
use credwatch_http::LogNotifier;

use crate::app::App;

/// Answers the credits and templates endpoints with fixed bodies.
pub struct FakeBackend {
    credits: Value,
    templates: Value,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(credits: Value, templates: Value) -> Arc<Self> {
        Arc::new(Self {
            credits,
            templates,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiCaller for FakeBackend {
    async fn call(&self, endpoint: &str, _token: &AccessToken, _payload: &Value) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match endpoint {
            CREDITS_ENDPOINT => Ok(self.credits.clone()),
            TEMPLATES_ENDPOINT => Ok(self.templates.clone()),
            _ => Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: 404,
                body: String::new(),
            }
            .into()),
        }
    }
}

/// Always succeeds, counting how often it ran.
#[derive(Default)]
pub struct CountingLogins(AtomicUsize);

impl CountingLogins {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for CountingLogins {
    async fn login(&self) -> std::result::Result<AccessToken, AuthenticationError> {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AccessToken::new(format!("token-{n}")))
    }
}

pub fn app(backend: Arc<FakeBackend>) -> (App, Arc<CountingLogins>) {
    let clock = Arc::new(SystemClock);
    let logins = Arc::new(CountingLogins::default());
    let session = SessionManager::new(
        Arc::new(MemoryTokenStore::new()),
        logins.clone(),
        clock.clone(),
        SessionConfig::default(),
    );
    let dispatcher =
        NotificationDispatcher::new(Arc::new(LogNotifier), clock.clone(), DispatchConfig::default());
    let credits = Arc::new(MemoryCreditCache::new());
    let pipeline = PollingPipeline::new(
        session,
        backend,
        dispatcher,
        clock,
        PipelineConfig::new("assistant-1"),
    )
    .with_credit_cache(credits.clone());

    (App { pipeline, credits }, logins)
}

pub fn pipeline(backend: Arc<FakeBackend>) -> (PollingPipeline, Arc<CountingLogins>) {
    let (app, logins) = app(backend);
    (app.pipeline, logins)
}
