//! Test doubles shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::Value;

use crate::error::{AuthenticationError, NotificationError};
use crate::traits::{ApiCaller, Authenticator, Clock, Notifier};
use crate::types::AlertEvent;
use crate::{AccessToken, Error, Result};

/// A fixed point in time used as "now" across tests.
pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub(crate) fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub(crate) fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// An authenticator that replays scripted outcomes and counts invocations.
#[derive(Debug)]
pub(crate) struct ScriptedAuthenticator {
    outcomes: Mutex<VecDeque<std::result::Result<AccessToken, AuthenticationError>>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedAuthenticator {
    pub(crate) fn new(
        outcomes: impl IntoIterator<Item = std::result::Result<AccessToken, AuthenticationError>>,
    ) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn tokens(tokens: &[&str]) -> Self {
        Self::new(tokens.iter().map(|t| Ok(AccessToken::new(*t))))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for ScriptedAuthenticator {
    async fn login(&self) -> std::result::Result<AccessToken, AuthenticationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(AuthenticationError::LoginFailed {
                    reason: "no scripted outcome left".to_string(),
                })
            })
    }
}

/// What a [`ScriptedApi`] should answer.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Json(Value),
    Unauthorized,
    ServerError(u16, &'static str),
}

/// An API double that replays scripted replies and records the tokens it saw.
#[derive(Debug, Default)]
pub(crate) struct ScriptedApi {
    replies: Mutex<VecDeque<Reply>>,
    seen_tokens: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen_tokens: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiCaller for ScriptedApi {
    async fn call(&self, endpoint: &str, token: &AccessToken, _payload: &Value) -> Result<Value> {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(token.as_str().to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected API call");
        match reply {
            Reply::Json(value) => Ok(value),
            Reply::Unauthorized => Err(Error::AuthFailed {
                endpoint: endpoint.to_string(),
            }),
            Reply::ServerError(status, body) => Err(crate::error::ApiError::Status {
                endpoint: endpoint.to_string(),
                status,
                body: body.to_string(),
            }
            .into()),
        }
    }
}

/// A notifier that records events, optionally failing every delivery.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    events: Mutex<Vec<AlertEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub(crate) fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, event: &AlertEvent) -> std::result::Result<(), NotificationError> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(NotificationError::Delivery {
                message: "channel unreachable".to_string(),
            });
        }
        Ok(())
    }
}
