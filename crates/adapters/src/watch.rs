// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Filesystem watcher for the Session Index's log root.
//!
//! Wraps `notify`'s recommended backend and coalesces raw events with a
//! stability window so a rapidly-appended-to log file is not re-parsed
//! mid-write. Watched recursively; callers are expected to filter to
//! `.jsonl` files themselves (the Index already walks to depth 2, so it
//! reuses that same filter here).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::env::watch_debounce;

/// A coalesced, debounced filesystem change under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RawKind {
    Created,
    Modified,
    Removed,
}

/// Handle kept alive for the lifetime of the watch; dropping it stops
/// both the OS watcher and the debounce task.
pub struct LogWatcher {
    _watcher: RecommendedWatcher,
    _debounce_task: tokio::task::JoinHandle<()>,
}

impl Drop for LogWatcher {
    fn drop(&mut self) {
        self._debounce_task.abort();
    }
}

/// Start watching `root` recursively, emitting debounced [`FsEvent`]s on `tx`.
pub fn watch_log_root(root: &Path, tx: mpsc::Sender<FsEvent>) -> Result<LogWatcher, notify::Error> {
    let pending: std::sync::Arc<Mutex<HashMap<PathBuf, (RawKind, Instant)>>> =
        std::sync::Arc::new(Mutex::new(HashMap::new()));
    let pending_for_watcher = pending.clone();

    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        let Ok(event) = res else { return };
        let kind = match event.kind {
            EventKind::Create(_) => RawKind::Created,
            EventKind::Modify(_) => RawKind::Modified,
            EventKind::Remove(_) => RawKind::Removed,
            _ => return,
        };
        let now = Instant::now();
        let mut pending = pending_for_watcher.lock();
        for path in event.paths {
            // A later Removed always wins; otherwise keep the freshest kind
            // but don't let a Modified downgrade a not-yet-flushed Created.
            let entry = pending.entry(path).or_insert((kind, now));
            match (entry.0, kind) {
                (RawKind::Created, RawKind::Modified) => entry.1 = now,
                _ => *entry = (kind, now),
            }
        }
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;

    let debounce_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(100));
        loop {
            ticker.tick().await;
            let window = watch_debounce();
            let ready: Vec<(PathBuf, RawKind)> = {
                let mut pending = pending.lock();
                let now = Instant::now();
                let ready_keys: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, (_, since))| now.duration_since(*since) >= window)
                    .map(|(path, _)| path.clone())
                    .collect();
                ready_keys
                    .into_iter()
                    .filter_map(|path| pending.remove(&path).map(|(kind, _)| (path, kind)))
                    .collect()
            };
            for (path, kind) in ready {
                let event = match kind {
                    RawKind::Created => FsEvent::Added(path),
                    RawKind::Modified => FsEvent::Changed(path),
                    RawKind::Removed => FsEvent::Removed(path),
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }
    });

    Ok(LogWatcher {
        _watcher: watcher,
        _debounce_task: debounce_task,
    })
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
