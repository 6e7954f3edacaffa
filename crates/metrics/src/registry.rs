//! Counter registry and the recorder trait it implements.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Opaque counter sink.
///
/// The single operation the pipeline needs: bump a named counter by a
/// signed delta. Implementations must tolerate concurrent callers.
pub trait Recorder: Send + Sync {
    /// Add `delta` to the counter named `key`.
    fn update(&self, key: &str, delta: i64);
}

/// Recorder that discards every update.
///
/// Useful where a component requires a recorder but the caller does not
/// care about counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn update(&self, _key: &str, _delta: i64) {}
}

/// Process-lifetime counter registry.
///
/// Counters are created on first update and kept in key order so the
/// shutdown dump is stable.
#[derive(Debug, Default)]
pub struct Registry {
    counters: Mutex<BTreeMap<String, i64>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key`, 0 if it was never updated.
    pub fn value(&self, key: &str) -> i64 {
        self.lock().get(key).copied().unwrap_or(0)
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.lock().clone()
    }

    /// Render every counter as one `key  value` line, keys aligned.
    pub fn render(&self) -> String {
        let snapshot = self.snapshot();
        let width = snapshot.keys().map(String::len).max().unwrap_or(0);
        let mut out = String::new();
        for (key, value) in &snapshot {
            let _ = writeln!(out, "{key:<width$}  {value}");
        }
        out
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, i64>> {
        // A counter update must never wedge on a poisoned lock.
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Recorder for Registry {
    fn update(&self, key: &str, delta: i64) {
        let mut counters = self.lock();
        match counters.get_mut(key) {
            Some(value) => *value += delta,
            None => {
                counters.insert(key.to_string(), delta);
            }
        }
    }
}
