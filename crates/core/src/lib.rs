// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-core: domain types and pure logic for the session relay daemon.
//!
//! Nothing in this crate touches the filesystem, spawns a process, or
//! opens a socket — that's `relay-adapters`' and `relay-daemon`'s job.
//! This crate is the vocabulary they share: ids, metadata, tab naming,
//! preview extraction, the error taxonomy, and the per-id serialization
//! primitive.

pub mod error;
pub mod id;
pub mod metadata;
pub mod pattern;
pub mod preview;
pub mod sequencer;
pub mod session_id;
pub mod tab;

pub use error::{ApiError, ErrorEnvelope};
pub use metadata::{MessageRole, MultiplexerStatus, SessionMetadata};
pub use pattern::{process_match_pattern, regex_escape};
pub use preview::{extract_preview, ContentBlock, MessageContent};
pub use sequencer::Sequencer;
pub use session_id::{is_uuid_shaped, SessionId};
pub use tab::{strip_tab_prefix, tab_name, TabDescriptor, DEFAULT_TAB_PREFIX};
