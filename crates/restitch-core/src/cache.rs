//! Process-wide step output cache.

use dashmap::DashMap;
use serde_json::Value;

/// Receiver for step outputs discovered during reconstruction.
///
/// Injected into the controller at construction; keys are
/// `{job_id}_{filename}`. Implementations must tolerate the same key being
/// reported again when a chain is reconstructed more than once.
pub trait StepOutputSink: Send + Sync {
    fn add(&self, key: &str, value: Value);
}

/// DashMap-backed [`StepOutputSink`].
///
/// Write-append-only from the reconstruction side, read-only for
/// presentation layers, no eviction; entries live for the process lifetime.
/// Populating it during reconstruction saves detail views a second round
/// trip for outputs the chain walk already saw.
#[derive(Debug, Default)]
pub struct StepOutputCache {
    entries: DashMap<String, Value>,
}

impl StepOutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl StepOutputSink for StepOutputCache {
    fn add(&self, key: &str, value: Value) {
        self.entries.insert(key.to_owned(), value);
    }
}
