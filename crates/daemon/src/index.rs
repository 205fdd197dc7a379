// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Session Index: the in-memory map of session id to
//! metadata, kept current by a full rescan at startup and incremental
//! filesystem events afterwards.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use relay_adapters::FsEvent;
use relay_core::{MultiplexerStatus, SessionId, SessionMetadata};
use relay_storage::CacheDocument;

use crate::parse::{self, parse_session_file};

/// A project grouping summary for `GET /api/projects`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub project_path: String,
    pub project_name: String,
    pub session_count: usize,
    pub latest_timestamp: DateTime<Utc>,
}

pub struct SessionIndex {
    root: PathBuf,
    cache_path: PathBuf,
    entries: HashMap<SessionId, SessionMetadata>,
    file_mtimes: HashMap<SessionId, SystemTime>,
    last_full_scan: DateTime<Utc>,
}

fn session_id_from_path(path: &Path) -> Option<SessionId> {
    if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
        return None;
    }
    path.file_stem()
        .map(|stem| SessionId::new(stem.to_string_lossy().to_string()))
}

fn project_dir_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().to_string())
}

/// Walk `root` to depth two: `root/<project>/<session>.jsonl`.
fn discover_files(root: &Path) -> Vec<(PathBuf, String)> {
    let mut out = Vec::new();
    let Ok(project_dirs) = fs::read_dir(root) else {
        return out;
    };
    for entry in project_dirs.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(dir_name) = project_dir_name(&path) else {
            continue;
        };
        let Ok(files) = fs::read_dir(&path) else {
            continue;
        };
        for file_entry in files.flatten() {
            let file_path = file_entry.path();
            if file_path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                out.push((file_path, dir_name.clone()));
            }
        }
    }
    out
}

impl SessionIndex {
    pub fn new(root: PathBuf, cache_path: PathBuf) -> Self {
        Self {
            root,
            cache_path,
            entries: HashMap::new(),
            file_mtimes: HashMap::new(),
            last_full_scan: Utc::now(),
        }
    }

    /// Seed from the persisted cache, if one exists and is valid. Does
    /// not replace a subsequent full rescan: cached `mtime` is never
    /// trusted, so the first rescan after loading still
    /// re-checks every file.
    pub fn load_cache(&mut self) {
        if let Some(doc) = CacheDocument::load(&self.cache_path) {
            for entry in doc.entries {
                self.entries.insert(entry.id.clone(), entry);
            }
            self.last_full_scan = doc.last_full_scan;
        }
    }

    pub fn save_cache(&self) -> Result<(), relay_storage::CacheError> {
        let doc = CacheDocument::new(self.entries.values().cloned().collect(), self.last_full_scan);
        doc.save(&self.cache_path)
    }

    fn reparse_one(&mut self, id: SessionId, path: &Path, project_dir: &str, mtime: SystemTime, now: DateTime<Utc>) {
        let mtime_utc: DateTime<Utc> = mtime.into();
        let existing = self.entries.get(&id).cloned();
        match parse_session_file(path, id.clone(), project_dir, existing.as_ref(), mtime_utc, now) {
            Some(metadata) => {
                self.entries.insert(id.clone(), metadata);
                self.file_mtimes.insert(id, mtime);
            }
            None => {
                self.entries.remove(&id);
                self.file_mtimes.remove(&id);
            }
        }
    }

    /// Full rescan: walk the log root, skip files whose mtime hasn't
    /// changed since the last rescan, and drop entries for files that no
    /// longer exist.
    pub fn rescan(&mut self, now: DateTime<Utc>) {
        let discovered = discover_files(&self.root);
        let mut seen: HashSet<SessionId> = HashSet::new();

        for (path, project_dir) in discovered {
            let Some(id) = session_id_from_path(&path) else {
                continue;
            };
            let Ok(stat) = fs::metadata(&path) else {
                continue;
            };
            let Ok(mtime) = stat.modified() else {
                continue;
            };
            seen.insert(id.clone());
            if self.file_mtimes.get(&id) == Some(&mtime) {
                continue;
            }
            self.reparse_one(id, &path, &project_dir, mtime, now);
        }

        let stale: Vec<SessionId> = self.entries.keys().filter(|id| !seen.contains(*id)).cloned().collect();
        for id in stale {
            self.entries.remove(&id);
            self.file_mtimes.remove(&id);
        }
        self.last_full_scan = now;
    }

    /// Apply a single debounced filesystem event (the incremental
    /// path). Uses the same single-file re-parse contract as
    /// `rescan`, so `multiplexer_status` is always preserved.
    pub fn apply_event(&mut self, event: FsEvent, now: DateTime<Utc>) {
        match event {
            FsEvent::Added(path) | FsEvent::Changed(path) => {
                let Some(id) = session_id_from_path(&path) else {
                    return;
                };
                let Some(project_dir) = project_dir_name(&path) else {
                    return;
                };
                let Ok(stat) = fs::metadata(&path) else {
                    return;
                };
                let Ok(mtime) = stat.modified() else {
                    return;
                };
                self.reparse_one(id, &path, &project_dir, mtime, now);
            }
            FsEvent::Removed(path) => {
                if let Some(id) = session_id_from_path(&path) {
                    self.entries.remove(&id);
                    self.file_mtimes.remove(&id);
                }
            }
        }
    }

    /// The log root this index was built to watch.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, id: &SessionId) -> Option<&SessionMetadata> {
        self.entries.get(id)
    }

    pub fn all(&self) -> Vec<SessionMetadata> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Update the advisory multiplexer status for a session, if known.
    pub fn set_multiplexer_status(&mut self, id: &SessionId, status: MultiplexerStatus) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.multiplexer_status = status;
        }
    }

    pub fn by_project(&self) -> Vec<ProjectSummary> {
        let mut grouped: HashMap<String, (String, usize, DateTime<Utc>)> = HashMap::new();
        for entry in self.entries.values() {
            let key = entry.project_key().to_string();
            let name = parse::project_name(&entry.project_path);
            let slot = grouped
                .entry(key)
                .or_insert((name, 0, entry.timestamp));
            slot.1 += 1;
            if entry.timestamp > slot.2 {
                slot.2 = entry.timestamp;
            }
        }
        let mut summaries: Vec<ProjectSummary> = grouped
            .into_iter()
            .map(|(project_path, (project_name, session_count, latest_timestamp))| ProjectSummary {
                project_path,
                project_name,
                session_count,
                latest_timestamp,
            })
            .collect();
        summaries.sort_by(|a, b| b.latest_timestamp.cmp(&a.latest_timestamp));
        summaries
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
