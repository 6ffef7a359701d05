//! Path-addressable state store.
//!
//! # Responsibilities
//! - Hold all server- and client-relevant state for one request
//! - Batch mutations until an explicit commit
//! - Track in-flight asynchronous operations under `$pending`
//!
//! # Design Decisions
//! - Paths are `/`-separated key chains; intermediate objects are created
//!   on commit
//! - Reads observe committed state only, so a half-applied batch is never
//!   visible
//! - Tracking markers take effect immediately: they guard the serialize
//!   step and must not sit in an uncommitted batch

use serde_json::{Map, Value};

/// Key namespace for tracked asynchronous operations.
pub const PENDING_NAMESPACE: &str = "$pending";

/// Returns true for keys flagged as dynamic/derived. Such keys are never
/// serialized or persisted.
pub fn is_dynamic_key(key: &str) -> bool {
    key.starts_with('$')
}

/// One queued mutation.
#[derive(Debug, Clone)]
struct Mutation {
    path: String,
    value: Value,
}

/// Path-addressable snapshot store over JSON values.
#[derive(Debug, Default)]
pub struct StateTree {
    root: Map<String, Value>,
    pending: Vec<Mutation>,
}

impl StateTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tree from a previously serialized snapshot.
    /// Non-object input yields an empty tree.
    pub fn from_value(value: Value) -> Self {
        let root = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            root,
            pending: Vec::new(),
        }
    }

    /// Read a committed value at `path`, e.g. `"context/utm/source"`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Queue a mutation. Takes effect on the next `commit()`.
    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        self.pending.push(Mutation {
            path: path.into(),
            value,
        });
    }

    /// Apply all queued mutations in order. Returns the number applied.
    pub fn commit(&mut self) -> usize {
        let batch = std::mem::take(&mut self.pending);
        let applied = batch.len();
        for mutation in batch {
            apply(&mut self.root, &mutation.path, mutation.value);
        }
        applied
    }

    /// Number of queued, not yet committed mutations.
    pub fn uncommitted(&self) -> usize {
        self.pending.len()
    }

    /// Clone of the committed tree.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Record the start of a tracked asynchronous operation.
    pub fn track_start(&mut self, id: &str) {
        apply(
            &mut self.root,
            &format!("{PENDING_NAMESPACE}/{id}"),
            serde_json::json!({ "in_progress": true }),
        );
    }

    /// Record the completion of a tracked asynchronous operation.
    pub fn track_finish(&mut self, id: &str) {
        apply(
            &mut self.root,
            &format!("{PENDING_NAMESPACE}/{id}"),
            serde_json::json!({ "in_progress": false }),
        );
    }

    /// Ids of tracked operations still marked in progress.
    pub fn pending_operations(&self) -> Vec<String> {
        let Some(Value::Object(entries)) = self.root.get(PENDING_NAMESPACE) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|(_, entry)| {
                entry
                    .get("in_progress")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }
}

fn apply(root: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry
            .as_object_mut()
            .expect("entry was just coerced to an object");
    }
    current.insert(last.to_string(), value);
}
