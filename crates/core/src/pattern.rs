// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Construction of the `pgrep -f` pattern used for the host-side
//! process-conflict check. No `regex` crate is used
//! anywhere in this codebase: the pattern below is fed to the external
//! `pgrep` binary, which does its own regex matching, so nothing here
//! needs to compile or evaluate a regex in-process.

/// Escape the characters `. * + ? ^ $ { } ( ) | [ ] \` with a backslash.
pub fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '.' | '*' | '+' | '?' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Build the pattern passed to `pgrep -f` to detect a host-side process
/// already resuming session `id` via `cli_binary`.
pub fn process_match_pattern(cli_binary: &str, id: &str) -> String {
    format!("{cli_binary}.*--resume.*{}", regex_escape(id))
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
