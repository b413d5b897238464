//! Runtime configuration shared by every subcommand.
//!
//! Every value can come from a flag or an environment variable; a `.env` file
//! in the working directory is loaded before parsing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, TimeDelta};
use clap::Args;
use directories::ProjectDirs;

use credwatch_core::dispatch::{DEFAULT_CREDIT_THRESHOLD, DispatchConfig};
use credwatch_core::{PipelineConfig, SessionConfig};
use credwatch_http::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_ORIGIN};

/// Name of the browser storage-state file inside the data directory.
const STORAGE_STATE_FILE: &str = "storage-state.json";

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Directory for the persisted session and cached readings
    #[arg(long, env = "CREDWATCH_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Dashboard backend base URL
    #[arg(long, env = "API_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub api_base_url: String,

    /// Origin sent with backend requests
    #[arg(long, env = "DASHBOARD_ORIGIN", default_value = DEFAULT_ORIGIN, global = true)]
    pub dashboard_origin: String,

    /// Dashboard assistant (account) to monitor
    #[arg(long, env = "ASSISTANT_ID", global = true)]
    pub assistant_id: Option<String>,

    /// Command that logs in and writes a browser storage-state file
    #[arg(long, env = "LOGIN_COMMAND", global = true)]
    pub login_command: Option<String>,

    /// Where the login command writes its storage state
    #[arg(long, env = "STORAGE_STATE_PATH", global = true)]
    pub storage_state: Option<PathBuf>,

    /// Cookie in the storage state that carries the bearer token
    #[arg(long, env = "TOKEN_COOKIE", default_value = "token", global = true)]
    pub token_cookie: String,

    /// Hours a fresh login is trusted
    #[arg(long, env = "SESSION_VALIDITY_HOURS", default_value_t = 24, global = true)]
    pub session_validity_hours: u32,

    /// Seconds before a login run is abandoned
    #[arg(long, env = "LOGIN_TIMEOUT_SECS", default_value_t = 60, global = true)]
    pub login_timeout_secs: u64,

    /// Seconds before a backend or webhook request is abandoned
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub request_timeout_secs: u64,

    /// Hours a template status change counts as recent
    #[arg(long, env = "TEMPLATE_WINDOW_HOURS", default_value_t = 4, global = true)]
    pub template_window_hours: u32,

    /// Alert when the balance drops below this
    #[arg(long, env = "CREDIT_THRESHOLD", default_value_t = DEFAULT_CREDIT_THRESHOLD, global = true)]
    pub credit_threshold: f64,

    /// Webhook receiving alerts; alerts are only logged when unset
    #[arg(long, env = "WEBHOOK_URL", global = true)]
    pub webhook_url: Option<String>,

    /// UTC offset in minutes used to render dates in alerts
    #[arg(
        long,
        env = "DISPLAY_UTC_OFFSET_MINUTES",
        default_value_t = 330,
        allow_hyphen_values = true,
        global = true
    )]
    pub display_offset_minutes: i32,
}

impl Config {
    /// The configured data directory, or the platform default.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let dirs = ProjectDirs::from("", "", "credwatch")
            .context("Could not determine data directory")?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn storage_state(&self) -> Result<PathBuf> {
        match &self.storage_state {
            Some(path) => Ok(path.clone()),
            None => Ok(self.data_dir()?.join(STORAGE_STATE_FILE)),
        }
    }

    pub fn login_command(&self) -> Result<&str> {
        self.login_command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .context("No login command configured. Set LOGIN_COMMAND or pass --login-command.")
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            validity: TimeDelta::hours(i64::from(self.session_validity_hours)),
            login_timeout: Duration::from_secs(self.login_timeout_secs),
        }
    }

    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base_url.clone(),
            origin: Some(self.dashboard_origin.clone()).filter(|o| !o.is_empty()),
            timeout: self.request_timeout(),
        }
    }

    pub fn pipeline(&self) -> Result<PipelineConfig> {
        let assistant_id = self
            .assistant_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .context("No assistant configured. Set ASSISTANT_ID or pass --assistant-id.")?;

        Ok(PipelineConfig {
            template_window: TimeDelta::hours(i64::from(self.template_window_hours)),
            ..PipelineConfig::new(assistant_id)
        })
    }

    pub fn dispatch(&self) -> Result<DispatchConfig> {
        let display_offset = self
            .display_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .with_context(|| {
                format!(
                    "Display offset of {} minutes is out of range",
                    self.display_offset_minutes
                )
            })?;

        Ok(DispatchConfig {
            credit_threshold: self.credit_threshold,
            display_offset,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
