// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Preview extraction from a log record's `message.content` field.
//!
//! `content` is a tagged union: either a plain string, or a list of
//! content blocks. Each block is itself a tagged record;
//! only `{"type":"text","text":"..."}` contributes text, matching the
//! CLI's own log format — other block types (tool_use, tool_result, ...)
//! are skipped.

use serde::Deserialize;

const PREVIEW_MAX_CHARS: usize = 200;

/// A single content block inside a `content` list.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// `message.content`: a plain string, or a list of blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Flatten to the text this content carries, joining block text with
    /// no separator (blocks are concatenated, matching a single logical
    /// message).
    pub fn flatten(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.kind == "text")
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Truncate `s` to at most 200 code points, appending `"..."` if it was
/// longer. The result has at most 203 code points and ends with `"..."`
/// iff `s` had more than 200 code points.
pub fn extract_preview(s: &str) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
#[path = "preview_tests.rs"]
mod tests;
