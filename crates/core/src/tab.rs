// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Multiplexer tab naming and the tab descriptor returned by queries.

use serde::{Deserialize, Serialize};

use crate::SessionId;

/// Default tab-name prefix (`claude.tab_prefix` in config, if ever exposed;
/// today fixed at this value — see DESIGN.md).
pub const DEFAULT_TAB_PREFIX: &str = "claude";

/// A multiplexer tab as observed by `list_all`/`list_ours`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabDescriptor {
    pub name: String,
    pub attached: bool,
    pub created: chrono::DateTime<chrono::Utc>,
}

/// Build the tab name for `id` under `prefix`: `"<prefix>-<id>"`.
pub fn tab_name(prefix: &str, id: &SessionId) -> String {
    format!("{prefix}-{}", id.as_str())
}

/// Recover the session id from a tab name, if it was built with `prefix`.
///
/// The round-trip law: `tab_name(id)` followed by stripping
/// the `"<prefix>-"` prefix yields `id`.
pub fn strip_tab_prefix(prefix: &str, name: &str) -> Option<SessionId> {
    let needle = format!("{prefix}-");
    name.strip_prefix(&needle).map(SessionId::new)
}

#[cfg(test)]
#[path = "tab_tests.rs"]
mod tests;
