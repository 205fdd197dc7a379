// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Per-id FIFO serialization primitive: `acquire(id, fn)`.
//!
//! Each key gets its own async mutex, created lazily and dropped once no
//! other call is waiting on it — the map never grows with cold keys.
//! Ordering is FIFO because `tokio::sync::Mutex` queues waiters in
//! arrival order.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

pub struct Sequencer<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for Sequencer<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Sequencer<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` exclusively with respect to any other `acquire` call for
    /// the same `key`. Calls for distinct keys proceed concurrently.
    ///
    /// A call that errors (or whose future is dropped by cancellation)
    /// still releases the lock for the next waiter — the mutex guard's
    /// drop is unconditional.
    pub async fn acquire<F, Fut, T>(&self, key: K, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
        };

        let result = {
            let _guard = lock.lock().await;
            f().await
        };

        let mut locks = self.locks.lock();
        if let Some(entry) = locks.get(&key) {
            if Arc::strong_count(entry) == 1 {
                locks.remove(&key);
            }
        }

        result
    }

    /// Number of keys with a live (or momentarily just-vacated) entry.
    /// Exposed for tests; not part of the public contract.
    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
#[path = "sequencer_tests.rs"]
mod tests;
