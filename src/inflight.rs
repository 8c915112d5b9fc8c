//! Busy-flag guard for credential submissions.
//!
//! DESIGN
//! ======
//! One in-flight operation per key (`signin:<email>`, `refresh:<sid>`, ...).
//! A second submission for a key that is still outstanding is rejected
//! instead of queued, so repeated clicks never fan out into duplicate
//! upstream calls. The key is released when the returned guard drops.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` busy. Returns `None` if it already is.
    #[must_use]
    pub fn try_begin(&self, key: impl Into<String>) -> Option<InFlightGuard> {
        let key = key.into();
        let mut keys = self
            .keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            tracing::debug!(%key, "duplicate submission rejected");
            return None;
        }
        Some(InFlightGuard { keys: Arc::clone(&self.keys), key })
    }

    #[cfg(test)]
    pub fn is_busy(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(key)
    }
}

/// Releases its key on drop.
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
#[path = "inflight_test.rs"]
mod tests;
