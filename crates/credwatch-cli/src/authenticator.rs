//! Login through an external command.
//!
//! The command (typically a headless-browser script) logs in to the dashboard
//! and writes the browser's storage state as JSON to the path given in
//! `CREDWATCH_STORAGE_STATE`. The bearer token is the value of one cookie in
//! that file.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use credwatch_core::AccessToken;
use credwatch_core::error::AuthenticationError;
use credwatch_core::traits::Authenticator;

/// Environment variable carrying the storage-state path to the login command.
pub const STORAGE_STATE_ENV: &str = "CREDWATCH_STORAGE_STATE";

#[derive(Debug, Deserialize)]
struct StorageState {
    #[serde(default)]
    cookies: Vec<Cookie>,
}

#[derive(Debug, Deserialize)]
struct Cookie {
    name: String,
    value: String,
}

/// Runs a login command and reads the token cookie it leaves behind.
#[derive(Debug, Clone)]
pub struct CommandAuthenticator {
    program: String,
    args: Vec<String>,
    storage_state: PathBuf,
    cookie: String,
}

impl CommandAuthenticator {
    /// Parse `command` with shell quoting rules.
    pub fn new(command: &str, storage_state: PathBuf, cookie: impl Into<String>) -> Result<Self> {
        let mut words = shell_words::split(command).context("Invalid login command")?;
        if words.is_empty() {
            bail!("Login command is empty");
        }
        let program = words.remove(0);

        Ok(Self {
            program,
            args: words,
            storage_state,
            cookie: cookie.into(),
        })
    }

    async fn remove_stale_state(&self) -> std::result::Result<(), AuthenticationError> {
        match tokio::fs::remove_file(&self.storage_state).await {
            Ok(()) => {
                debug!("Removed previous storage state");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthenticationError::LoginFailed {
                reason: format!(
                    "could not remove stale storage state {}: {e}",
                    self.storage_state.display()
                ),
            }),
        }
    }
}

#[async_trait]
impl Authenticator for CommandAuthenticator {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn login(&self) -> std::result::Result<AccessToken, AuthenticationError> {
        if let Some(parent) = self.storage_state.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            warn!(path = %parent.display(), error = %e, "Could not create storage state directory");
        }
        self.remove_stale_state().await?;

        // Dropping the future (login timeout) kills the child.
        let output = Command::new(&self.program)
            .args(&self.args)
            .env(STORAGE_STATE_ENV, &self.storage_state)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AuthenticationError::LoginFailed {
                reason: format!("could not start `{}`: {e}", self.program),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(stdout = %stdout.trim(), "Login command output");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or_default().trim().to_string();
            return Err(AuthenticationError::LoginFailed {
                reason: format!("login command exited with {}: {detail}", output.status),
            });
        }

        let bytes = tokio::fs::read(&self.storage_state)
            .await
            .map_err(|e| AuthenticationError::MissingToken {
                reason: format!(
                    "storage state {} not written: {e}",
                    self.storage_state.display()
                ),
            })?;

        token_from_storage_state(&bytes, &self.cookie, &self.storage_state)
    }
}

/// Pull the named cookie out of a browser storage-state document.
fn token_from_storage_state(
    bytes: &[u8],
    cookie: &str,
    path: &Path,
) -> std::result::Result<AccessToken, AuthenticationError> {
    let state: StorageState =
        serde_json::from_slice(bytes).map_err(|e| AuthenticationError::MissingToken {
            reason: format!("invalid storage state {}: {e}", path.display()),
        })?;

    state
        .cookies
        .into_iter()
        .find(|c| c.name == cookie && !c.value.is_empty())
        .map(|c| AccessToken::new(c.value))
        .ok_or_else(|| AuthenticationError::MissingToken {
            reason: format!("no `{cookie}` cookie in {}", path.display()),
        })
}
