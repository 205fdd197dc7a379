// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Subprocess execution helpers.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Timeout for `tmux` list/has-session/new-session/kill-session invocations.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the `pgrep` process-conflict check.
pub const PGREP_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the `pkill` orphan-reconciliation sweep.
pub const PKILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{description} failed: {io_err}")),
        Err(_elapsed) => Err(format!(
            "{description} timed out after {}s",
            timeout.as_secs()
        )),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
