//! Session management: the authentication state machine.
//!
//! [`SessionManager`] is the only owner of the dashboard session. It hands out
//! the cached token while the session is valid, runs the login flow when it is
//! not, and coalesces concurrent callers onto a single in-flight login.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::AccessToken;
use crate::error::AuthenticationError;
use crate::traits::{Authenticator, Clock, TokenStore};
use crate::types::Session;

type LoginOutcome = std::result::Result<Session, AuthenticationError>;
type SharedLogin = Shared<BoxFuture<'static, LoginOutcome>>;

/// Session lifetime and login bounds.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How long a fresh login is trusted before a proactive refresh.
    pub validity: TimeDelta,
    /// Hard upper bound on one login run.
    pub login_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            validity: TimeDelta::hours(24),
            login_timeout: Duration::from_secs(60),
        }
    }
}

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
}

/// A point-in-time view of the session, safe to expose (no token).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: SessionState,
    pub expires_at: Option<DateTime<Utc>>,
    pub valid: bool,
    /// The failure of the last login attempt, if it failed.
    pub last_error: Option<String>,
}

enum Phase {
    Unauthenticated,
    Authenticating { attempt: u64, login: SharedLogin },
    Authenticated(Session),
    Expired,
    Failed(AuthenticationError),
}

/// Owner of the dashboard session.
///
/// Cheap to clone; clones share state. At most one [`Authenticator::login`]
/// runs at a time per manager, and every caller that asks for a token while it
/// runs receives that login's outcome.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    store: Arc<dyn TokenStore>,
    authenticator: Arc<dyn Authenticator>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    phase: Mutex<Phase>,
    attempts: AtomicU64,
}

impl SessionManager {
    /// Create a manager, restoring a still-valid session from `store`.
    pub fn new(
        store: Arc<dyn TokenStore>,
        authenticator: Arc<dyn Authenticator>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let phase = match store.load() {
            Some(session) if session.is_valid_at(clock.now()) => {
                info!(expires_at = %session.expires_at(), "Restored persisted session");
                Phase::Authenticated(session)
            }
            Some(session) => {
                debug!(expires_at = %session.expires_at(), "Persisted session has lapsed");
                Phase::Unauthenticated
            }
            None => Phase::Unauthenticated,
        };

        Self {
            inner: Arc::new(ManagerInner {
                store,
                authenticator,
                clock,
                config,
                phase: Mutex::new(phase),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Return a usable token, logging in first if needed.
    ///
    /// # Errors
    ///
    /// Returns the login failure (shared with every concurrent caller) if the
    /// login flow fails or times out.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> std::result::Result<AccessToken, AuthenticationError> {
        let (attempt, login) = {
            let mut phase = self.lock_phase();
            let now = self.inner.clock.now();
            match &*phase {
                Phase::Authenticated(session) if session.is_valid_at(now) => {
                    return Ok(session.token().clone());
                }
                Phase::Authenticating { attempt, login } => {
                    debug!(attempt = *attempt, "Joining in-flight login");
                    (*attempt, login.clone())
                }
                _ => self.begin_login(&mut phase),
            }
        };

        debug!(attempt, "Awaiting login");
        login.await.map(|session| session.token().clone())
    }

    /// Force a fresh login ("refresh now").
    ///
    /// Joins the in-flight login instead if one is already running.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> std::result::Result<AccessToken, AuthenticationError> {
        self.invalidate();
        self.get_token().await
    }

    /// Discard the current session and its persisted copy.
    ///
    /// Safe to call redundantly. Ignored while a login is in flight, since the
    /// session that login produces has not been seen by anyone yet.
    pub fn invalidate(&self) {
        self.expire(None);
    }

    /// Discard the current session only if it still carries `rejected`.
    ///
    /// Used after an API rejected `rejected`: if another caller has already
    /// re-authenticated, the newer session is kept.
    pub fn invalidate_token(&self, rejected: &AccessToken) {
        self.expire(Some(rejected));
    }

    /// Check whether a usable session is cached.
    pub fn is_valid(&self) -> bool {
        let now = self.inner.clock.now();
        matches!(&*self.lock_phase(), Phase::Authenticated(session) if session.is_valid_at(now))
    }

    /// Snapshot the current state.
    pub fn status(&self) -> SessionStatus {
        let now = self.inner.clock.now();
        let phase = self.lock_phase();
        match &*phase {
            Phase::Unauthenticated => SessionStatus {
                state: SessionState::Unauthenticated,
                expires_at: None,
                valid: false,
                last_error: None,
            },
            Phase::Authenticating { .. } => SessionStatus {
                state: SessionState::Authenticating,
                expires_at: None,
                valid: false,
                last_error: None,
            },
            Phase::Authenticated(session) => {
                let valid = session.is_valid_at(now);
                SessionStatus {
                    state: if valid {
                        SessionState::Authenticated
                    } else {
                        SessionState::Expired
                    },
                    expires_at: Some(session.expires_at()),
                    valid,
                    last_error: None,
                }
            }
            Phase::Expired => SessionStatus {
                state: SessionState::Expired,
                expires_at: None,
                valid: false,
                last_error: None,
            },
            Phase::Failed(err) => SessionStatus {
                state: SessionState::Unauthenticated,
                expires_at: None,
                valid: false,
                last_error: Some(err.to_string()),
            },
        }
    }

    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.inner.lock_phase()
    }

    fn begin_login(&self, phase: &mut Phase) -> (u64, SharedLogin) {
        let attempt = self.inner.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        info!(attempt, "Starting login");

        // The attempt runs on its own task so it finishes and settles the
        // phase even if every waiter goes away.
        let task = tokio::spawn(Self::login(self.inner.clone(), attempt));
        let login = async move {
            task.await.unwrap_or_else(|e| {
                warn!(attempt, error = %e, "Login task did not complete");
                Err(login_panicked())
            })
        }
        .boxed()
        .shared();

        *phase = Phase::Authenticating {
            attempt,
            login: login.clone(),
        };
        (attempt, login)
    }

    fn login(inner: Arc<ManagerInner>, attempt: u64) -> BoxFuture<'static, LoginOutcome> {
        async move {
            let outcome = AssertUnwindSafe(inner.run_login(attempt))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(login_panicked()));
            inner.complete_login(attempt, &outcome);
            outcome
        }
        .boxed()
    }

    fn expire(&self, rejected: Option<&AccessToken>) {
        let mut phase = self.lock_phase();
        let current = match &*phase {
            Phase::Authenticating { .. } => {
                debug!("Login in flight, nothing to invalidate");
                return;
            }
            Phase::Authenticated(session) => Some(session.token().clone()),
            _ => None,
        };

        if let Some(current) = current {
            if rejected.is_some_and(|rejected| *rejected != current) {
                debug!("Rejected token was already replaced");
                return;
            }
            *phase = Phase::Expired;
            info!("Session invalidated");
        }

        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }
}

impl ManagerInner {
    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_login(&self, attempt: u64) -> LoginOutcome {
        let timeout = self.config.login_timeout;
        let token = match tokio::time::timeout(timeout, self.authenticator.login()).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(AuthenticationError::Timeout {
                    seconds: timeout.as_secs(),
                });
            }
        };

        let session = Session::new(token, self.clock.now() + self.config.validity);
        if let Err(e) = self.store.save(&session) {
            warn!(attempt, error = %e, "Failed to persist session, keeping it in memory");
        }
        Ok(session)
    }

    fn complete_login(&self, attempt: u64, outcome: &LoginOutcome) {
        let mut phase = self.lock_phase();
        let current = matches!(
            &*phase,
            Phase::Authenticating { attempt: running, .. } if *running == attempt
        );
        if !current {
            return;
        }

        *phase = match outcome {
            Ok(session) => {
                info!(attempt, expires_at = %session.expires_at(), "Login succeeded");
                Phase::Authenticated(session.clone())
            }
            Err(e) => {
                warn!(attempt, error = %e, "Login failed");
                Phase::Failed(e.clone())
            }
        };
    }
}

fn login_panicked() -> AuthenticationError {
    AuthenticationError::LoginFailed {
        reason: "login panicked".to_string(),
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.status().state)
            .field("config", &self.inner.config)
            .finish()
    }
}
