// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Turns one `.jsonl` transcript file into [`SessionMetadata`].
//!
//! Only a bounded header (the first lines, carrying `cwd`/`version`) and a
//! bounded tail of the file (for the most recent message, and a possible
//! `version` refresh) are read; large transcripts never need a full scan.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, Utc};
use relay_core::{MessageContent, MessageRole, MultiplexerStatus, SessionId, SessionMetadata};
use serde_json::Value;

/// Bound on how much of the tail of a large file is read back for the
/// most recent message. Files at or below this size are read whole.
pub const TAIL_READ_BYTES: u64 = 4096;

/// Bound on how much of the start of the file is scanned for the header.
pub const HEADER_READ_BYTES: u64 = 128 * 1024;

/// How many non-blank lines within [`HEADER_READ_BYTES`] are considered
/// when looking for `cwd`/`version`.
pub const HEADER_MAX_LINES: usize = 20;

struct RawSections {
    header_lines: Vec<String>,
    tail_lines: Vec<String>,
}

fn read_sections(path: &Path) -> io::Result<Option<RawSections>> {
    let size = std::fs::metadata(path)?.len();
    if size == 0 {
        return Ok(None);
    }

    if size <= TAIL_READ_BYTES {
        let text = std::fs::read_to_string(path)?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        if lines.is_empty() {
            return Ok(None);
        }
        let header_lines = lines.iter().filter(|l| !l.trim().is_empty()).take(HEADER_MAX_LINES).cloned().collect();
        return Ok(Some(RawSections { header_lines, tail_lines: lines }));
    }

    let mut file = File::open(path)?;
    let header_cap = HEADER_READ_BYTES.min(size) as usize;
    let mut header_buf = vec![0u8; header_cap];
    file.read_exact(&mut header_buf)?;
    let header_text = String::from_utf8_lossy(&header_buf);
    let header_lines: Vec<String> = header_text
        .split('\n')
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .take(HEADER_MAX_LINES)
        .map(str::to_string)
        .collect();

    let tail_start = size.saturating_sub(TAIL_READ_BYTES);
    file.seek(SeekFrom::Start(tail_start))?;
    let mut tail_bytes = Vec::new();
    file.read_to_end(&mut tail_bytes)?;
    let tail_text = String::from_utf8_lossy(&tail_bytes);
    let mut tail_lines: Vec<String> = tail_text.lines().map(str::to_string).collect();
    // The chunk starts mid-file; its first "line" is a partial fragment.
    if !tail_lines.is_empty() {
        tail_lines.remove(0);
    }

    Ok(Some(RawSections { header_lines, tail_lines }))
}

/// Scan the first [`HEADER_MAX_LINES`] non-blank header lines for the
/// first non-empty `cwd` and the first non-empty `version`, stopping
/// once both are set.
fn header_fields(header_lines: &[String]) -> (Option<String>, Option<String>) {
    let mut cwd = None;
    let mut version = None;
    for line in header_lines {
        if cwd.is_some() && version.is_some() {
            break;
        }
        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if cwd.is_none() {
            cwd = obj.get("cwd").and_then(Value::as_str).map(str::to_string);
        }
        if version.is_none() {
            version = obj.get("version").and_then(Value::as_str).map(str::to_string);
        }
    }
    (cwd, version)
}

/// Fallback when no `cwd` turned up in the header: Claude Code derives
/// `project_hash` from the original path by replacing `/` with `-`, so
/// stripping a leading `-` and reversing that substitution recovers an
/// approximation of the path.
fn synthesize_project_path(project_hash: &str) -> String {
    let stripped = project_hash.strip_prefix('-').unwrap_or(project_hash);
    format!("/{}", stripped.replace('-', "/"))
}

/// Scan the tail for the most recent non-empty `version`, refreshing
/// whatever the header supplied.
fn tail_version(tail_lines: &[String]) -> Option<String> {
    for line in tail_lines.iter().rev() {
        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if let Some(version) = obj.get("version").and_then(Value::as_str) {
            return Some(version.to_string());
        }
    }
    None
}

struct LastMessage {
    preview: String,
    role: MessageRole,
}

fn parse_role(type_field: Option<&str>) -> MessageRole {
    match type_field {
        Some("user") => MessageRole::User,
        Some("assistant") => MessageRole::Assistant,
        _ => MessageRole::Unknown,
    }
}

fn last_message(tail_lines: &[String]) -> Option<LastMessage> {
    for line in tail_lines.iter().rev() {
        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(message) = obj.get("message") else { continue };
        let Some(content_value) = message.get("content") else { continue };
        let Ok(content) = serde_json::from_value::<MessageContent>(content_value.clone()) else {
            continue;
        };
        let flattened = content.flatten();
        if flattened.is_empty() {
            continue;
        }
        let role = parse_role(obj.get("type").and_then(Value::as_str));
        return Some(LastMessage {
            preview: relay_core::extract_preview(&flattened),
            role,
        });
    }
    None
}

/// Parse a single transcript file into metadata.
///
/// `mtime` is the file's last-modification time, used as `timestamp`
/// (the log's own `timestamp` field, if any, is not trusted — the
/// filesystem is the source of truth for recency). Returns `None` for an
/// empty file (no metadata should exist for it). On a read or parse
/// failure, falls back to `existing` unchanged, or a placeholder if this
/// is the first time the file has been seen.
pub fn parse_session_file(
    path: &Path,
    id: SessionId,
    project_dir_name: &str,
    existing: Option<&SessionMetadata>,
    mtime: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<SessionMetadata> {
    let sections = match read_sections(path) {
        Ok(Some(sections)) => sections,
        Ok(None) => return None,
        Err(_) => {
            return Some(
                existing
                    .cloned()
                    .unwrap_or_else(|| SessionMetadata::unreadable_placeholder(id, now)),
            )
        }
    };

    let (cwd, header_version) = header_fields(&sections.header_lines);
    let version = tail_version(&sections.tail_lines).or(header_version);
    let multiplexer_status = existing
        .map(|m| m.multiplexer_status)
        .unwrap_or(MultiplexerStatus::None);

    match last_message(&sections.tail_lines) {
        Some(found) => Some(SessionMetadata {
            id,
            project_path: cwd.unwrap_or_else(|| synthesize_project_path(project_dir_name)),
            project_hash: project_dir_name.to_string(),
            last_message_preview: found.preview,
            last_message_role: found.role,
            timestamp: mtime,
            cli_version: version.unwrap_or_default(),
            multiplexer_status,
        }),
        None => {
            if let Some(cwd) = cwd {
                // A header was present but no message yet; record what we know.
                Some(SessionMetadata {
                    id,
                    project_path: cwd,
                    project_hash: project_dir_name.to_string(),
                    last_message_preview: String::new(),
                    last_message_role: MessageRole::Unknown,
                    timestamp: mtime,
                    cli_version: version.unwrap_or_default(),
                    multiplexer_status,
                })
            } else {
                Some(
                    existing
                        .cloned()
                        .unwrap_or_else(|| SessionMetadata::unreadable_placeholder(id, now)),
                )
            }
        }
    }
}

/// Derive a human-friendly project name from its path (final segment).
pub fn project_name(project_path: &str) -> String {
    Path::new(project_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| project_path.to_string())
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
