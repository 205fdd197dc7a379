// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the multiplexer binary, subprocess
//! execution, and the log-root filesystem watcher.

mod env;
pub mod multiplexer;
pub mod subprocess;
pub mod watch;

pub use multiplexer::{MultiplexerAdapter, MultiplexerError, TmuxMultiplexerAdapter};
pub use subprocess::run_with_timeout;
pub use watch::{watch_log_root, FsEvent, LogWatcher};

#[cfg(any(test, feature = "test-support"))]
pub use multiplexer::{FakeMultiplexerAdapter, MultiplexerCall};
