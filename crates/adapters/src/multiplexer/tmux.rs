// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! `tmux`-backed [`MultiplexerAdapter`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::TabDescriptor;
use tokio::process::Command;

use super::{MultiplexerAdapter, MultiplexerError};
use crate::subprocess::{run_with_timeout, PGREP_TIMEOUT, PKILL_TIMEOUT, TMUX_TIMEOUT};

/// tmux-based multiplexer adapter.
#[derive(Clone, Default)]
pub struct TmuxMultiplexerAdapter;

impl TmuxMultiplexerAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MultiplexerAdapter for TmuxMultiplexerAdapter {
    async fn list_all(&self) -> Result<Vec<TabDescriptor>, MultiplexerError> {
        let mut cmd = Command::new("tmux");
        cmd.args([
            "list-sessions",
            "-F",
            "#{session_name}\t#{session_attached}\t#{session_created}",
        ]);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux list-sessions")
            .await
            .map_err(MultiplexerError::CommandFailed)?;

        // No tmux server running at all looks like a command failure with
        // "no server running on ..." on stderr; that means zero tabs, not
        // an error the caller needs to see.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no server running") || stderr.contains("No such file") {
                return Ok(Vec::new());
            }
            return Err(MultiplexerError::CommandFailed(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_tab_line).collect())
    }

    async fn exists(&self, name: &str) -> Result<bool, MultiplexerError> {
        let mut cmd = Command::new("tmux");
        cmd.args(["has-session", "-t", name]);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux has-session")
            .await
            .map_err(MultiplexerError::CommandFailed)?;
        Ok(output.status.success())
    }

    async fn create(
        &self,
        name: &str,
        cols: u16,
        rows: u16,
        command: &str,
    ) -> Result<(), MultiplexerError> {
        let mut cmd = Command::new("tmux");
        cmd.args([
            "new-session",
            "-d",
            "-s",
            name,
            "-x",
            &cols.to_string(),
            "-y",
            &rows.to_string(),
            command,
        ]);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux new-session")
            .await
            .map_err(MultiplexerError::CommandFailed)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MultiplexerError::CommandFailed(stderr.trim().to_string()));
        }
        Ok(())
    }

    async fn kill(&self, name: &str) -> Result<(), MultiplexerError> {
        let mut cmd = Command::new("tmux");
        cmd.args(["kill-session", "-t", name]);
        // Errors (including "no such session") are ignored: kill is
        // best-effort and absence of the tab is not a failure.
        let _ = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux kill-session").await;
        Ok(())
    }

    async fn kill_orphan_attachers(&self, prefix: &str) -> Result<(), MultiplexerError> {
        let mut cmd = Command::new("pkill");
        cmd.args(["-f", &format!("tmux attach-session -t {prefix}-")]);
        // pkill exits non-zero when nothing matched; that's not an error.
        let _ = run_with_timeout(cmd, PKILL_TIMEOUT, "pkill orphan attachers").await;
        Ok(())
    }

    async fn process_conflict(&self, pattern: &str) -> Result<bool, MultiplexerError> {
        let mut cmd = Command::new("pgrep");
        cmd.args(["-f", pattern]);
        let output = run_with_timeout(cmd, PGREP_TIMEOUT, "pgrep process conflict")
            .await
            .map_err(MultiplexerError::CommandFailed)?;
        Ok(output.status.success() && !output.stdout.is_empty())
    }
}

fn parse_tab_line(line: &str) -> Option<TabDescriptor> {
    let mut fields = line.splitn(3, '\t');
    let name = fields.next()?.to_string();
    let attached = fields.next()? == "1";
    let created_secs: i64 = fields.next()?.parse().ok()?;
    let created: DateTime<Utc> = DateTime::from_timestamp(created_secs, 0)?;
    Some(TabDescriptor {
        name,
        attached,
        created,
    })
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
