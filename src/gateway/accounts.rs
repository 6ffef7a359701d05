//! Session and account lookup collaborator.
//!
//! Authentication policy is external to this service: the gateway only
//! exchanges an opaque session token for a principal and reads/writes the
//! account-held experiment assignment. `MemoryAccountStore` backs tests
//! and the demo wiring; deployments plug their own store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::{ready, BoxFuture};

use crate::experiments::Assignment;

/// An authenticated account resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: String,
}

/// Opaque session/account lookup.
pub trait AccountStore: Send + Sync {
    fn lookup_session(&self, token: &str) -> BoxFuture<'static, Option<Principal>>;

    fn experiment_assignment(&self, account_id: &str) -> BoxFuture<'static, Option<Assignment>>;

    fn store_experiment_assignment(
        &self,
        account_id: &str,
        assignment: Assignment,
    ) -> BoxFuture<'static, ()>;
}

#[derive(Default)]
struct MemoryAccounts {
    sessions: BTreeMap<String, String>,
    assignments: BTreeMap<String, Assignment>,
}

/// In-memory account store.
#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    inner: Arc<Mutex<MemoryAccounts>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session token for an account.
    pub fn insert_session(&self, token: impl Into<String>, account_id: impl Into<String>) {
        self.locked().sessions.insert(token.into(), account_id.into());
    }

    /// Seed an account-held assignment directly.
    pub fn seed_assignment(&self, account_id: impl Into<String>, assignment: Assignment) {
        self.locked()
            .assignments
            .insert(account_id.into(), assignment);
    }

    /// The stored assignment for an account, if any.
    pub fn assignment(&self, account_id: &str) -> Option<Assignment> {
        self.locked().assignments.get(account_id).cloned()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, MemoryAccounts> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AccountStore for MemoryAccountStore {
    fn lookup_session(&self, token: &str) -> BoxFuture<'static, Option<Principal>> {
        let principal = self
            .locked()
            .sessions
            .get(token)
            .map(|account_id| Principal {
                account_id: account_id.clone(),
            });
        Box::pin(ready(principal))
    }

    fn experiment_assignment(&self, account_id: &str) -> BoxFuture<'static, Option<Assignment>> {
        Box::pin(ready(self.locked().assignments.get(account_id).cloned()))
    }

    fn store_experiment_assignment(
        &self,
        account_id: &str,
        assignment: Assignment,
    ) -> BoxFuture<'static, ()> {
        self.locked()
            .assignments
            .insert(account_id.to_string(), assignment);
        Box::pin(ready(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_lookup_and_assignment_round_trip() {
        let store = MemoryAccountStore::new();
        store.insert_session("tok-1", "acct-9");

        assert_eq!(
            store.lookup_session("tok-1").await,
            Some(Principal {
                account_id: "acct-9".to_string()
            })
        );
        assert_eq!(store.lookup_session("other").await, None);

        let assignment: Assignment =
            [("checkout_flow".to_string(), "control".to_string())].into();
        store
            .store_experiment_assignment("acct-9", assignment.clone())
            .await;
        assert_eq!(
            store.experiment_assignment("acct-9").await,
            Some(assignment)
        );
    }
}
