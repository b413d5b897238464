//! File-backed session store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use credwatch_core::traits::TokenStore;
use credwatch_core::{AccessToken, Result, Session};

use crate::SESSION_FILE;
use crate::write::{read_json, remove, write_json};

/// Stored session data.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Persists the dashboard session as a single JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the session at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the session as `session.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SESSION_FILE))
    }

    /// Returns the session file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<Session> {
        let stored: StoredSession = read_json(&self.path)?;
        Some(Session::new(
            AccessToken::new(stored.token),
            stored.expires_at,
        ))
    }

    #[instrument(skip(self, session), fields(path = %self.path.display()))]
    fn save(&self, session: &Session) -> Result<()> {
        let stored = StoredSession {
            token: session.token().as_str().to_string(),
            expires_at: session.expires_at(),
        };
        write_json(&self.path, &stored)
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn clear(&self) -> Result<()> {
        remove(&self.path)
    }
}
