// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! The Session Index's persisted cache: a versioned JSON document saved
//! under the config directory so a restart doesn't require a full
//! re-parse of every session log.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use relay_core::{MultiplexerStatus, SessionMetadata};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bumped whenever the on-disk shape changes incompatibly. A mismatch on
/// load is treated the same as a missing file: start from an empty cache.
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The on-disk shape of the Session Index's persisted cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDocument {
    pub version: u32,
    pub entries: Vec<SessionMetadata>,
    pub last_full_scan: DateTime<Utc>,
}

impl CacheDocument {
    pub fn new(entries: Vec<SessionMetadata>, last_full_scan: DateTime<Utc>) -> Self {
        Self {
            version: CACHE_VERSION,
            entries,
            last_full_scan,
        }
    }

    /// Write the document to `path` atomically (write to a sibling temp
    /// file, then rename). The file is created with mode `0600`; the
    /// caller is responsible for the parent directory's `0700` mode
    /// (see [`ensure_private_dir`]).
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
            ensure_private_dir(parent)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            set_private_file_mode(&file)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load the document from `path`. A missing file, a version mismatch,
    /// or a corrupt document are all treated as "no cache" — the caller
    /// falls back to a full rescan — rather than as hard errors.
    ///
    /// On success, every entry's `multiplexer_status` is reset to `none`:
    /// cached `mtime` is never trusted, and the status is
    /// always re-derived from a live tab query.
    pub fn load(path: &Path) -> Option<CacheDocument> {
        let file = File::open(path).ok()?;
        let reader = BufReader::new(file);
        let mut doc: CacheDocument = match serde_json::from_reader(reader) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt session cache, ignoring");
                return None;
            }
        };
        if doc.version != CACHE_VERSION {
            tracing::info!(
                path = %path.display(),
                found = doc.version,
                expected = CACHE_VERSION,
                "session cache version mismatch, ignoring"
            );
            return None;
        }
        for entry in &mut doc.entries {
            entry.multiplexer_status = MultiplexerStatus::None;
        }
        Some(doc)
    }
}

#[cfg(unix)]
fn ensure_private_dir(dir: &Path) -> Result<(), CacheError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn ensure_private_dir(_dir: &Path) -> Result<(), CacheError> {
    Ok(())
}

#[cfg(unix)]
fn set_private_file_mode(file: &File) -> Result<(), CacheError> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_private_file_mode(_file: &File) -> Result<(), CacheError> {
    Ok(())
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
