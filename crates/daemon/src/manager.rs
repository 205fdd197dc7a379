// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Multiplexer Manager: the only thing that talks to the
//! `MultiplexerAdapter`, and the sole place per-session attach ops are
//! serialized.

use std::sync::Arc;

use relay_adapters::MultiplexerAdapter;
use relay_core::{process_match_pattern, strip_tab_prefix, tab_name, ApiError, Sequencer, SessionId, TabDescriptor};

/// Queried by the Manager before creating a tab, without holding a
/// back-pointer to the Terminal Bridge: avoids a reference cycle and
/// keeps the Manager testable with a mock predicate.
pub type HasActivePredicate = Arc<dyn Fn(&SessionId) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct AttachOutcome {
    pub tab_name: String,
    pub existed: bool,
}

pub struct ManagerConfig {
    pub tab_prefix: String,
    pub cli_binary: String,
    pub default_cols: u16,
    pub default_rows: u16,
    pub max_sessions: usize,
}

pub struct MultiplexerManager<A: MultiplexerAdapter> {
    adapter: A,
    has_active: HasActivePredicate,
    config: ManagerConfig,
    sequencer: Sequencer<SessionId>,
}

fn adapter_err(e: relay_adapters::MultiplexerError) -> ApiError {
    ApiError::Internal(e.to_string())
}

impl<A: MultiplexerAdapter> MultiplexerManager<A> {
    pub fn new(adapter: A, has_active: HasActivePredicate, config: ManagerConfig) -> Self {
        Self {
            adapter,
            has_active,
            config,
            sequencer: Sequencer::new(),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<TabDescriptor>, ApiError> {
        self.adapter.list_all().await.map_err(adapter_err)
    }

    /// Tabs belonging to this daemon (matching its configured prefix).
    pub async fn list_ours(&self) -> Result<Vec<TabDescriptor>, ApiError> {
        let all = self.list_all().await?;
        Ok(all
            .into_iter()
            .filter(|tab| strip_tab_prefix(&self.config.tab_prefix, &tab.name).is_some())
            .collect())
    }

    pub async fn kill(&self, tab: &str) -> Result<(), ApiError> {
        self.adapter.kill(tab).await.map_err(adapter_err)
    }

    /// Run at daemon startup: kill orphaned attach-child processes left
    /// by a prior daemon instance, and return the ids of tabs that
    /// already exist so the Index can mark them `detached`.
    pub async fn reconcile(&self) -> Result<Vec<SessionId>, ApiError> {
        self.adapter
            .kill_orphan_attachers(&self.config.tab_prefix)
            .await
            .map_err(adapter_err)?;
        let ours = self.list_ours().await?;
        Ok(ours
            .iter()
            .filter_map(|tab| strip_tab_prefix(&self.config.tab_prefix, &tab.name))
            .collect())
    }

    /// Attach to (or create) the tab for `id`, serialized per id:
    /// concurrent attaches for the same id run one at a
    /// time, in FIFO order, with no overlap; independent ids proceed in
    /// parallel.
    pub async fn attach(&self, id: &SessionId) -> Result<AttachOutcome, ApiError> {
        let tab = tab_name(&self.config.tab_prefix, id);
        self.sequencer
            .acquire(id.clone(), || self.attach_locked(id, &tab))
            .await
    }

    async fn attach_locked(&self, id: &SessionId, tab: &str) -> Result<AttachOutcome, ApiError> {
        if (self.has_active)(id) {
            return Err(ApiError::SessionAttached);
        }

        let pattern = process_match_pattern(&self.config.cli_binary, id.as_str());
        if self.adapter.process_conflict(&pattern).await.map_err(adapter_err)? {
            return Err(ApiError::SessionConflict);
        }

        let ours = self.list_ours().await?;
        let already_ours = ours.iter().any(|t| t.name == tab);
        if ours.len() >= self.config.max_sessions && !already_ours {
            return Err(ApiError::MaxSessions);
        }

        if self.adapter.exists(tab).await.map_err(adapter_err)? {
            return Ok(AttachOutcome {
                tab_name: tab.to_string(),
                existed: true,
            });
        }

        let command = format!("{} --resume {}", self.config.cli_binary, id.as_str());
        self.adapter
            .create(tab, self.config.default_cols, self.config.default_rows, &command)
            .await
            .map_err(adapter_err)?;
        Ok(AttachOutcome {
            tab_name: tab.to_string(),
            existed: false,
        })
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
