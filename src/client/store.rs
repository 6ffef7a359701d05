//! Client-side observable store.
//!
//! The render path only ever needs get/set/serialize, so the server-side
//! `StateTree` carries no subscriptions. On the client the resumed view
//! does need to react to later mutations, so this wrapper adds a
//! subscription hook that fires on commit.

use serde_json::Value;

use crate::state::StateTree;

/// Handle returned by [`ClientStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Value) + Send>;

/// The resumed state tree plus commit subscriptions.
pub struct ClientStore {
    tree: StateTree,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl ClientStore {
    pub fn new(tree: StateTree) -> Self {
        Self {
            tree,
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Read a committed value.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.tree.get(path)
    }

    /// Queue a mutation. Takes effect on the next `commit()`.
    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        self.tree.set(path, value);
    }

    /// Apply queued mutations and notify subscribers with the committed
    /// snapshot. An empty batch notifies nobody.
    pub fn commit(&mut self) -> usize {
        let applied = self.tree.commit();
        if applied > 0 && !self.subscribers.is_empty() {
            let snapshot = self.tree.snapshot();
            for (_, subscriber) in &mut self.subscribers {
                subscriber(&snapshot);
            }
        }
        applied
    }

    /// Register a callback invoked after every non-empty commit.
    pub fn subscribe<F>(&mut self, f: F) -> SubscriptionId
    where
        F: FnMut(&Value) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    /// Drop a subscription. Returns false when the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// The underlying tree, for read-only collaborators.
    pub fn tree(&self) -> &StateTree {
        &self.tree
    }
}
