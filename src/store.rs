//! # Key-Value Storage
//!
//! In-memory key-value map with interior mutability, plus the append-only
//! replication log that `SYNC` serves to catching-up secondaries. Both live
//! behind the same mutex: a mutation and its log entry must commit as one
//! atomic step (spec §3, P2).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One locally-originated mutation, recorded for `SYNC` catch-up.
///
/// `timestamp` is seconds elapsed since the store was created, not wall
/// clock time: the spec only requires a monotonic ordering key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationLogEntry {
    pub timestamp: f64,
    pub operation: Operation,
    pub key: String,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Set,
    Delete,
}

struct Inner {
    data: HashMap<String, Value>,
    log: Vec<ReplicationLogEntry>,
}

/// A thread-safe key-value store with an attached replication log.
///
/// All operations are atomic with respect to each other: the map and the log
/// are mutated under one lock, so a reader never observes a log entry
/// without the corresponding map mutation or vice versa.
pub struct KVStore {
    inner: Mutex<Inner>,
    epoch: Instant,
}

impl Default for KVStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KVStore {
    /// Create a new empty key-value store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                data: HashMap::new(),
                log: Vec::new(),
            }),
            epoch: Instant::now(),
        }
    }

    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Upsert `key -> value` and append a SET entry to the replication log.
    /// Always succeeds.
    pub fn set(&self, key: String, value: Value) {
        let ts = self.now();
        let mut inner = self.inner.lock().unwrap();
        inner.data.insert(key.clone(), value.clone());
        inner.log.push(ReplicationLogEntry {
            timestamp: ts,
            operation: Operation::Set,
            key,
            value: Some(value),
        });
    }

    /// Retrieve a value for the given key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().unwrap().data.get(key).cloned()
    }

    /// Remove `key` if present, appending a DELETE entry to the log on
    /// success. Returns whether the key was present.
    pub fn delete(&self, key: &str) -> bool {
        let ts = self.now();
        let mut inner = self.inner.lock().unwrap();
        if inner.data.remove(key).is_some() {
            inner.log.push(ReplicationLogEntry {
                timestamp: ts,
                operation: Operation::Delete,
                key: key.to_string(),
                value: None,
            });
            true
        } else {
            false
        }
    }

    /// Apply a mutation received via replication. Unlike `set`/`delete`,
    /// this does not append to the local log: the log is a trace of
    /// locally-originated events, and re-logging a replicated mutation would
    /// create a replication loop if this node were later promoted.
    pub fn apply_replication(&self, operation: Operation, key: String, value: Option<Value>) {
        let mut inner = self.inner.lock().unwrap();
        match operation {
            Operation::Set => {
                inner.data.insert(key, value.unwrap_or(Value::Null));
            }
            Operation::Delete => {
                inner.data.remove(&key);
            }
        }
    }

    /// A consistent copy of the entire map.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.lock().unwrap().data.clone()
    }

    /// Replication log entries with `timestamp > since`, in append order.
    pub fn log_since(&self, since: f64) -> Vec<ReplicationLogEntry> {
        self.inner
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|e| e.timestamp > since)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_roundtrips_scalar() {
        let store = KVStore::new();
        store.set("k".into(), json!("v"));
        assert_eq!(store.get("k"), Some(json!("v")));
    }

    #[test]
    fn set_then_get_roundtrips_object_and_array() {
        let store = KVStore::new();
        store.set("user:1".into(), json!({"name": "Alice", "tags": [1, 2, 3]}));
        assert_eq!(
            store.get("user:1"),
            Some(json!({"name": "Alice", "tags": [1, 2, 3]}))
        );
    }

    #[test]
    fn get_missing_key_returns_none() {
        let store = KVStore::new();
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn delete_reports_presence() {
        let store = KVStore::new();
        assert!(!store.delete("k"));
        store.set("k".into(), json!(1));
        assert!(store.delete("k"));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn set_and_delete_append_to_log() {
        let store = KVStore::new();
        store.set("a".into(), json!(1));
        store.delete("a");
        let log = store.log_since(-1.0);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].operation, Operation::Set);
        assert_eq!(log[1].operation, Operation::Delete);
    }

    #[test]
    fn apply_replication_does_not_append_to_log() {
        let store = KVStore::new();
        store.apply_replication(Operation::Set, "a".into(), Some(json!(1)));
        assert_eq!(store.get("a"), Some(json!(1)));
        assert!(store.log_since(-1.0).is_empty());
    }

    #[test]
    fn snapshot_is_a_consistent_copy() {
        let store = KVStore::new();
        store.set("a".into(), json!(1));
        store.set("b".into(), json!(2));
        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
        store.set("c".into(), json!(3));
        assert_eq!(snap.len(), 2, "snapshot must not observe later mutations");
    }
}
