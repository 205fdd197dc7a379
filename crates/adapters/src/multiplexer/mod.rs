// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Adapters wrapping the external terminal multiplexer binary.

mod tmux;

pub use tmux::TmuxMultiplexerAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMultiplexerAdapter, MultiplexerCall};

use async_trait::async_trait;
use relay_core::TabDescriptor;
use thiserror::Error;

/// Errors from multiplexer operations.
///
/// "No such tab" / "no such process" outcomes are never represented as
/// errors — they're the `false`/`None` arm of the relevant `Result`.
/// Only unexpected failures (binary
/// missing, permission denied, malformed output) reach this type.
#[derive(Debug, Error)]
pub enum MultiplexerError {
    #[error("multiplexer command failed: {0}")]
    CommandFailed(String),
}

/// Wraps all interaction with the external multiplexer binary.
#[async_trait]
pub trait MultiplexerAdapter: Clone + Send + Sync + 'static {
    /// List every tab the multiplexer knows about, ours and otherwise.
    async fn list_all(&self) -> Result<Vec<TabDescriptor>, MultiplexerError>;

    /// `true` if a tab named `name` exists.
    async fn exists(&self, name: &str) -> Result<bool, MultiplexerError>;

    /// Create a detached tab named `name` of size `(cols, rows)` running `command`.
    async fn create(
        &self,
        name: &str,
        cols: u16,
        rows: u16,
        command: &str,
    ) -> Result<(), MultiplexerError>;

    /// Best-effort kill; absence of the tab is not an error.
    async fn kill(&self, name: &str) -> Result<(), MultiplexerError>;

    /// Kill any orphaned attach-child processes left behind by a prior
    /// daemon (`pkill -f "tmux attach-session -t <prefix>-"`).
    async fn kill_orphan_attachers(&self, prefix: &str) -> Result<(), MultiplexerError>;

    /// `true` if a host-side process matching `pattern` is running
    /// (`pgrep -f <pattern>`; non-empty stdout is a match).
    async fn process_conflict(&self, pattern: &str) -> Result<bool, MultiplexerError>;
}
