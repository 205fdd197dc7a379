// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Quiescence window before a batch of filesystem events is processed:
/// a stability window of roughly 500ms before a changed file is
/// considered settled. Override with `CLAUDE_RELAY_WATCH_DEBOUNCE_MS`.
pub fn watch_debounce() -> Duration {
    parse_duration_ms("CLAUDE_RELAY_WATCH_DEBOUNCE_MS").unwrap_or(Duration::from_millis(500))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
