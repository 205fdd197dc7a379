// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Session metadata: the value the Index maps session ids to.

use serde::{Deserialize, Serialize};

use crate::SessionId;

/// Role of the most recent message a session's log tail supplies a preview for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    Unknown,
}

impl Default for MessageRole {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Advisory, possibly-stale view of a session's multiplexer tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplexerStatus {
    /// A remote client is attached to the tab (Bridge reports `has_active`).
    Active,
    /// The tab exists but no client is attached.
    Detached,
    /// No tab exists for this session.
    None,
}

impl Default for MultiplexerStatus {
    fn default() -> Self {
        Self::None
    }
}

/// One entry in the Session Index.
///
/// `timestamp` is the log file's last-modification time, not a field
/// extracted from the log content: the log's own `timestamp`
/// field is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub id: SessionId,
    #[serde(default)]
    pub project_path: String,
    #[serde(default)]
    pub project_hash: String,
    #[serde(default)]
    pub last_message_preview: String,
    #[serde(default)]
    pub last_message_role: MessageRole,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub cli_version: String,
    #[serde(default)]
    pub multiplexer_status: MultiplexerStatus,
}

impl SessionMetadata {
    /// Build a placeholder entry for a file that could not be read or
    /// stat'd.
    pub fn unreadable_placeholder(id: SessionId, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            id,
            project_path: String::new(),
            project_hash: String::new(),
            last_message_preview: "(unable to read)".to_string(),
            last_message_role: MessageRole::Unknown,
            timestamp: now,
            cli_version: String::new(),
            multiplexer_status: MultiplexerStatus::None,
        }
    }

    /// The grouping key `by_project` uses: `project_path` when non-empty,
    /// otherwise `project_hash`.
    pub fn project_key(&self) -> &str {
        if self.project_path.is_empty() {
            &self.project_hash
        } else {
            &self.project_path
        }
    }
}
