//! Authenticated session type.

use chrono::{DateTime, Utc};

use crate::AccessToken;

/// A token together with the instant it stops being usable.
///
/// A session is valid iff its expiry is strictly in the future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: AccessToken,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session.
    pub fn new(token: AccessToken, expires_at: DateTime<Utc>) -> Self {
        Self { token, expires_at }
    }

    /// Returns the bearer token for this session.
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// Returns the expiry instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check whether the session is still usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
