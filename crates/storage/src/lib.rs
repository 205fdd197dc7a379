// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-storage: on-disk persistence for the Session Index's cache.

pub mod cache;

pub use cache::{CacheDocument, CacheError, CACHE_VERSION};
