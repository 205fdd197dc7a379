// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-daemon: the `relayd` binary's library half.
//!
//! Wires together the Session Index (`index`), the Multiplexer Manager
//! (`manager`), and the Terminal Bridge (`bridge`) behind an HTTP+WebSocket
//! API (`http`), with config loading (`config`) and log-file parsing
//! (`parse`) as supporting pieces.

pub mod batch;
pub mod bridge;
pub mod config;
pub mod control;
pub mod http;
pub mod index;
pub mod manager;
pub mod parse;

pub use bridge::{BridgeConfig, NativePtySpawner, PtySession, PtySpawner, TerminalBridge, TerminalSocket};
pub use config::{Config, ConfigError};
pub use control::{parse_control_message, ControlMessage};
pub use index::{ProjectSummary, SessionIndex};
pub use manager::{AttachOutcome, HasActivePredicate, ManagerConfig, MultiplexerManager};
