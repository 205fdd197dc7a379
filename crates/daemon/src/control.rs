// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Parsing of WebSocket text-frame control messages on the
//! socket-to-PTY path. Today the only recognized form
//! resizes the PTY; anything else is a silently-ignored no-op.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlMessageWire {
    Resize { cols: u16, rows: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    Resize { cols: u16, rows: u16 },
}

/// Parse a text frame as a control message. Malformed JSON, an unknown
/// `type`, or a frame that isn't a JSON object at all all yield `None`.
pub fn parse_control_message(text: &str) -> Option<ControlMessage> {
    match serde_json::from_str::<ControlMessageWire>(text) {
        Ok(ControlMessageWire::Resize { cols, rows }) => Some(ControlMessage::Resize { cols, rows }),
        Err(_) => None,
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
