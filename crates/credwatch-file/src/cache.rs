//! File-backed credit cache.

use std::path::{Path, PathBuf};

use tracing::instrument;

use credwatch_core::traits::CreditCache;
use credwatch_core::{CreditReading, Result};

use crate::CREDIT_FILE;
use crate::write::{read_json, write_json};

/// Keeps the last successful credit reading as `{credits, timestamp}`.
#[derive(Debug, Clone)]
pub struct FileCreditCache {
    path: PathBuf,
}

impl FileCreditCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache inside `dir` as `latest-credit.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CREDIT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CreditCache for FileCreditCache {
    fn latest(&self) -> Option<CreditReading> {
        read_json(&self.path)
    }

    #[instrument(skip(self, reading), fields(credits = reading.credits))]
    fn record(&self, reading: &CreditReading) -> Result<()> {
        write_json(&self.path, reading)
    }
}
