// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Session identifier type and UUID-shape validation.
//!
//! A `SessionId` is opaque and, for sessions discovered on disk, is always
//! byte-for-byte equal to the log file's basename (sans extension). Only
//! the per-session REST handlers (`GET /api/sessions/:id`, the WebSocket
//! upgrade) require the UUID shape; `POST /attach` does not (see
//! `crate::UUID_RE` callers and DESIGN.md's Open Question decision).

crate::define_id! {
    /// Unique identifier for a discovered session.
    pub struct SessionId;
}

/// Returns `true` if `s` matches `^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$`.
///
/// Implemented by hand rather than via the `regex` crate: the shape is fixed
/// and small enough that a linear scan is both clearer and cheaper than
/// building a regex engine into the hot path of every request.
pub fn is_uuid_shaped(s: &str) -> bool {
    let groups: [usize; 5] = [8, 4, 4, 4, 12];
    let mut rest = s;
    for (i, &len) in groups.iter().enumerate() {
        if i > 0 {
            match rest.strip_prefix('-') {
                Some(r) => rest = r,
                None => return false,
            }
        }
        if rest.len() < len {
            return false;
        }
        let (head, tail) = rest.split_at(len);
        if !head.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return false;
        }
        rest = tail;
    }
    rest.is_empty()
}

impl SessionId {
    /// `true` if this id is shaped like a lowercase UUID.
    pub fn is_uuid_shaped(&self) -> bool {
        is_uuid_shaped(self.as_str())
    }
}

#[cfg(test)]
#[path = "session_id_tests.rs"]
mod tests;
