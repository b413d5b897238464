//! Atomic replace-on-write for small JSON records.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use credwatch_core::error::StorageError;
use credwatch_core::{Error, Result};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub(crate) fn map_io(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |err| {
        Error::Storage(StorageError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

/// Serialize `value` and atomically replace `path` with it.
///
/// The record is written to a uniquely named sibling and renamed into place,
/// so readers see either the old or the new record. Writers serialize on an
/// exclusive lock file next to the target.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(map_io(parent))?;
    }

    let content = serde_json::to_vec_pretty(value).map_err(|e| {
        Error::Storage(StorageError::Encode {
            message: e.to_string(),
        })
    })?;

    let lock_path = lock_path(path);
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(map_io(&lock_path))?;
    lock_file.lock_exclusive().map_err(map_io(&lock_path))?;

    let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    let result = write_temp(&temp_path, &content).and_then(|()| {
        fs::rename(&temp_path, path).map_err(map_io(path))
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    if let Err(e) = FileExt::unlock(&lock_file) {
        warn!(path = %lock_path.display(), error = %e, "Failed to release lock");
    }

    if result.is_ok() {
        debug!(path = %path.display(), "Wrote record");
    }
    result
}

fn write_temp(temp_path: &Path, content: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(temp_path)
        .map_err(map_io(temp_path))?;

    // Restrict before any secret hits the disk.
    #[cfg(unix)]
    fs::set_permissions(temp_path, fs::Permissions::from_mode(0o600))
        .map_err(map_io(temp_path))?;

    file.write_all(content).map_err(map_io(temp_path))?;
    file.sync_data().map_err(map_io(temp_path))?;
    Ok(())
}

/// Read and decode `path`, treating any failure as absence.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read record");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed record");
            None
        }
    }
}

/// Remove `path` if it exists.
pub(crate) fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed record");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(map_io(path)(e)),
    }
}
