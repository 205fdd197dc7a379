// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Fake multiplexer adapter for testing.
#![cfg_attr(coverage_nightly, coverage(off))]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use relay_core::TabDescriptor;

use super::{MultiplexerAdapter, MultiplexerError};

/// Recorded multiplexer call, for assertions in tests.
#[derive(Debug, Clone)]
pub enum MultiplexerCall {
    ListAll,
    Exists { name: String },
    Create { name: String, cols: u16, rows: u16, command: String },
    Kill { name: String },
    KillOrphanAttachers { prefix: String },
    ProcessConflict { pattern: String },
}

struct FakeState {
    tabs: HashMap<String, TabDescriptor>,
    calls: Vec<MultiplexerCall>,
    conflicting_patterns: Vec<String>,
    fail_create: bool,
}

#[derive(Clone)]
pub struct FakeMultiplexerAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeMultiplexerAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                tabs: HashMap::new(),
                calls: Vec::new(),
                conflicting_patterns: Vec::new(),
                fail_create: false,
            })),
        }
    }
}

impl FakeMultiplexerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MultiplexerCall> {
        self.inner.lock().calls.clone()
    }

    /// Pre-seed a tab as if a prior daemon (or this one) had created it.
    pub fn seed_tab(&self, name: &str, attached: bool) {
        self.inner.lock().tabs.insert(
            name.to_string(),
            TabDescriptor {
                name: name.to_string(),
                attached,
                created: Utc::now(),
            },
        );
    }

    pub fn set_attached(&self, name: &str, attached: bool) {
        if let Some(tab) = self.inner.lock().tabs.get_mut(name) {
            tab.attached = attached;
        }
    }

    /// Make `process_conflict` report a conflict for any pattern containing `needle`.
    pub fn set_conflicting(&self, needle: &str) {
        self.inner.lock().conflicting_patterns.push(needle.to_string());
    }

    pub fn fail_next_create(&self) {
        self.inner.lock().fail_create = true;
    }

    pub fn tab_count(&self) -> usize {
        self.inner.lock().tabs.len()
    }
}

#[async_trait]
impl MultiplexerAdapter for FakeMultiplexerAdapter {
    async fn list_all(&self) -> Result<Vec<TabDescriptor>, MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::ListAll);
        Ok(inner.tabs.values().cloned().collect())
    }

    async fn exists(&self, name: &str) -> Result<bool, MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::Exists {
            name: name.to_string(),
        });
        Ok(inner.tabs.contains_key(name))
    }

    async fn create(
        &self,
        name: &str,
        cols: u16,
        rows: u16,
        command: &str,
    ) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::Create {
            name: name.to_string(),
            cols,
            rows,
            command: command.to_string(),
        });
        if inner.fail_create {
            inner.fail_create = false;
            return Err(MultiplexerError::CommandFailed("fake create failure".to_string()));
        }
        inner.tabs.insert(
            name.to_string(),
            TabDescriptor {
                name: name.to_string(),
                attached: false,
                created: Utc::now(),
            },
        );
        Ok(())
    }

    async fn kill(&self, name: &str) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::Kill {
            name: name.to_string(),
        });
        inner.tabs.remove(name);
        Ok(())
    }

    async fn kill_orphan_attachers(&self, prefix: &str) -> Result<(), MultiplexerError> {
        self.inner.lock().calls.push(MultiplexerCall::KillOrphanAttachers {
            prefix: prefix.to_string(),
        });
        Ok(())
    }

    async fn process_conflict(&self, pattern: &str) -> Result<bool, MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::ProcessConflict {
            pattern: pattern.to_string(),
        });
        Ok(inner
            .conflicting_patterns
            .iter()
            .any(|needle| pattern.contains(needle.as_str())))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
