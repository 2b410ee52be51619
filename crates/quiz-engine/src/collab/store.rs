use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::CollabError;

const CHANNEL_CAPACITY: usize = 64;

/// How a write combines with the document already at the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    /// Deep-merges objects; any other value replaces what is there.
    Merge,
}

/// Broadcast by a store after every successful write.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub written: String,
    pub snapshot: Arc<Value>,
}

/// What a subscriber sees: the document at its own path after a related write.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub path: String,
    pub value: Option<Value>,
}

/// Hierarchical document storage addressed by `/`-separated paths.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<Value>, CollabError>;

    async fn write(&self, path: &str, value: Value, mode: WriteMode) -> Result<(), CollabError>;

    /// Real-time updates for writes at, above or below `path`.
    fn subscribe(&self, path: &str) -> Result<Subscription, CollabError>;
}

pub struct Subscription {
    path: Vec<String>,
    receiver: broadcast::Receiver<StoreEvent>,
}

impl Subscription {
    pub fn new(path: &str, receiver: broadcast::Receiver<StoreEvent>) -> Result<Self, CollabError> {
        Ok(Self {
            path: segments(path)?,
            receiver,
        })
    }

    /// Waits for the next change touching this path. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<DocumentChange> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    let Ok(written) = segments(&event.written) else {
                        continue;
                    };
                    if !related(&self.path, &written) {
                        continue;
                    }
                    return Some(DocumentChange {
                        path: self.path.join("/"),
                        value: get_path(&event.snapshot, &self.path).cloned(),
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(path = %self.path.join("/"), skipped, "subscriber lagged behind store");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// JSON tree held in memory, with change notifications.
pub struct MemoryDocumentStore {
    root: RwLock<Value>,
    changes: broadcast::Sender<StoreEvent>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            changes,
        }
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole tree, for inspection and export.
    pub fn snapshot(&self) -> Value {
        self.root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, CollabError> {
        let path = segments(path)?;
        let root = self.root.read().unwrap_or_else(PoisonError::into_inner);
        Ok(get_path(&root, &path).cloned())
    }

    async fn write(&self, path: &str, value: Value, mode: WriteMode) -> Result<(), CollabError> {
        let parts = segments(path)?;
        let snapshot = {
            let mut root = self.root.write().unwrap_or_else(PoisonError::into_inner);
            let slot = slot_mut(&mut root, &parts);
            match mode {
                WriteMode::Replace => *slot = value,
                WriteMode::Merge => merge(slot, value),
            }
            Arc::new(root.clone())
        };
        debug!(path, ?mode, "document written");
        // No subscribers is fine.
        let _ = self.changes.send(StoreEvent {
            written: path.to_string(),
            snapshot,
        });
        Ok(())
    }

    fn subscribe(&self, path: &str) -> Result<Subscription, CollabError> {
        Subscription::new(path, self.changes.subscribe())
    }
}

pub fn draft_path(prefix: &str, user_id: &str, quiz_id: &str) -> String {
    format!("{prefix}/{user_id}/drafts/{quiz_id}")
}

pub fn intake_path(prefix: &str, user_id: &str, quiz_id: &str) -> String {
    format!("{prefix}/{user_id}/intake/{quiz_id}")
}

pub fn membership_path(prefix: &str, user_id: &str) -> String {
    format!("{prefix}/{user_id}/membership")
}

fn segments(path: &str) -> Result<Vec<String>, CollabError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(|segment| segment.trim().is_empty()) {
        return Err(CollabError::InvalidPath(path.to_string()));
    }
    Ok(trimmed.split('/').map(str::to_string).collect())
}

fn related(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b).all(|(left, right)| left == right)
}

fn get_path<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |current, segment| current.as_object()?.get(segment))
}

fn slot_mut<'a>(root: &'a mut Value, path: &[String]) -> &'a mut Value {
    path.iter().fold(root, |current, segment| {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        &mut current[segment.as_str()]
    })
}

fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (key, value) in fields {
                merge(existing.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, other) => *target = other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paths_reject_empty_segments() {
        assert!(segments("users//draft").is_err());
        assert!(segments("/").is_err());
        assert_eq!(
            segments("/users/u1/").expect("valid"),
            vec!["users".to_string(), "u1".to_string()]
        );
    }

    #[test]
    fn merge_keeps_sibling_fields() {
        let mut doc = json!({ "plan": "basic", "meta": { "a": 1 } });
        merge(&mut doc, json!({ "meta": { "b": 2 }, "active": true }));
        assert_eq!(
            doc,
            json!({ "plan": "basic", "meta": { "a": 1, "b": 2 }, "active": true })
        );
    }
}
