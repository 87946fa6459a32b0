//! Atomic publication of the current-state JSON document
//!
//! The document is written to a temporary sibling of the target and renamed
//! over it, so readers see either the previous or the new document in full.

use crate::error::{GridlogError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::sampler::Sample;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON document other processes read for the latest sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub grid: Option<i64>,
    pub solar: Option<i64>,
    pub powerwall: Option<i64>,
    pub home: Option<i64>,
    pub grid_up: bool,
    pub percentage: Option<f64>,
    /// Epoch seconds of the sample
    pub last_updated: i64,
}

impl From<&Sample> for StateDocument {
    fn from(sample: &Sample) -> Self {
        Self {
            grid: sample.grid_watts,
            solar: sample.solar_watts,
            powerwall: sample.powerwall_watts,
            home: sample.home_watts,
            grid_up: sample.grid_up,
            percentage: sample.percentage,
            last_updated: sample.epoch_seconds(),
        }
    }
}

/// Temporary sibling path for `target`: `.<stem>.<pid>.<nanos>.<random>[.<ext>]`
pub fn temp_path_for(target: &Path) -> PathBuf {
    let dir = parent_dir(target);
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let random = uuid::Uuid::new_v4().simple().to_string();
    let mut name = format!(
        ".{}.{}.{}.{}",
        stem,
        std::process::id(),
        nanos,
        &random[..8]
    );
    if let Some(ext) = target.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    dir.join(name)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Atomically replace `path` with `contents`
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    atomic_write_with(path, |file| file.write_all(contents))
}

/// Atomically replace `path` with whatever `write` puts into the temp file.
///
/// On failure the temp file is removed and `path` is left untouched.
pub fn atomic_write_with<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let logger = get_logger("publisher");
    let tmp = temp_path_for(path);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp)
        .map_err(|e| {
            GridlogError::publish(format!(
                "Failed to create temporary file {}: {}",
                tmp.display(),
                e
            ))
        })?;

    let written = write(&mut file).and_then(|_| file.sync_all());
    drop(file);

    let result = written
        .map_err(|e| format!("Failed to write {}: {}", tmp.display(), e))
        .and_then(|_| {
            carry_over_metadata(path, &tmp, &logger);
            fs::rename(&tmp, path).map_err(|e| {
                format!(
                    "Failed to rename {} onto {}: {}",
                    tmp.display(),
                    path.display(),
                    e
                )
            })
        });

    if let Err(message) = result {
        let _ = fs::remove_file(&tmp);
        return Err(GridlogError::publish(message));
    }
    Ok(())
}

/// Copy owner, group and mode of an existing target onto the temp file
#[cfg(unix)]
fn carry_over_metadata(target: &Path, tmp: &Path, logger: &StructuredLogger) {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let Ok(meta) = fs::metadata(target) else {
        return;
    };
    if let Err(e) = std::os::unix::fs::chown(tmp, Some(meta.uid()), Some(meta.gid())) {
        // Expected when not running as root and the target has another owner
        logger.debug(&format!(
            "Could not copy ownership of {}: {}",
            target.display(),
            e
        ));
    }
    if let Err(e) = fs::set_permissions(tmp, fs::Permissions::from_mode(meta.mode() & 0o7777)) {
        logger.warn(&format!(
            "Could not copy permissions of {}: {}",
            target.display(),
            e
        ));
    }
}

#[cfg(not(unix))]
fn carry_over_metadata(target: &Path, tmp: &Path, logger: &StructuredLogger) {
    if let Ok(meta) = fs::metadata(target)
        && let Err(e) = fs::set_permissions(tmp, meta.permissions())
    {
        logger.warn(&format!(
            "Could not copy permissions of {}: {}",
            target.display(),
            e
        ));
    }
}

/// Publishes [`StateDocument`]s to one path
pub struct StatePublisher {
    path: PathBuf,
    logger: StructuredLogger,
}

impl StatePublisher {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            logger: get_logger("publisher"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the state file with `document`, pretty-printed
    pub fn publish(&self, document: &StateDocument) -> Result<()> {
        atomic_write_with(&self.path, |file| {
            serde_json::to_writer_pretty(&mut *file, document)?;
            file.write_all(b"\n")
        })?;
        self.logger
            .debug(&format!("Published state to {}", self.path.display()));
        Ok(())
    }

    /// Read back the current document; `None` before the first publish
    pub fn load(&self) -> Result<Option<StateDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}
