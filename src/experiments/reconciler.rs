//! Experiment variant reconciliation.
//!
//! # Responsibilities
//! - Merge cookie- and account-held assignments into one result
//! - Validate every assignment against the current variant domain
//! - Sample replacements for missing or out-of-domain values
//! - Detect drift between the two stores
//!
//! # Design Decisions
//! - The account copy wins per-key conflicts; it is authoritative for an
//!   authenticated principal
//! - A value outside the current domain is reassigned, exactly like a
//!   missing key
//! - `changed` also fires on a key-count mismatch, covering catalog
//!   growth and shrinkage even when every surviving key is valid
//! - No locking around the cookie/account read-modify-write: the
//!   computation is idempotent once settled, so concurrent applications
//!   converge instead of compounding

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::experiments::catalog::ExperimentCatalog;

/// Map of experiment key → assigned variant.
pub type Assignment = BTreeMap<String, String>;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub assignment: Assignment,
    /// A key was assigned or reassigned, or the key sets went out of step
    /// with the catalog.
    pub changed: bool,
    /// Account and cookie stores hold different key sets and must both be
    /// rewritten, even if `changed` is false.
    pub drift_detected: bool,
}

impl Reconciliation {
    /// True when the cookie store must be rewritten.
    pub fn write_cookie(&self) -> bool {
        self.changed || self.drift_detected
    }

    /// True when the account store must be rewritten (authenticated only;
    /// callers without a principal have nowhere to write).
    pub fn write_account(&self) -> bool {
        self.changed || self.drift_detected
    }
}

/// Reconcile the stored assignments against the live catalog.
pub fn reconcile<R: Rng>(
    catalog: &ExperimentCatalog,
    account: Option<&Assignment>,
    cookie: &Assignment,
    rng: &mut R,
) -> Reconciliation {
    let mut prior = cookie.clone();
    if let Some(account) = account {
        // account wins on key conflicts
        prior.extend(account.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let mut changed = prior.len() != catalog.len();
    let mut assignment = Assignment::new();

    for experiment in catalog.iter() {
        let kept = prior
            .get(&experiment.key)
            .filter(|value| experiment.variants.iter().any(|v| v == *value));
        match kept {
            Some(value) => {
                assignment.insert(experiment.key.clone(), value.clone());
            }
            None => {
                if let Some(sampled) = sample(&experiment.variants, rng) {
                    assignment.insert(experiment.key.clone(), sampled);
                }
                changed = true;
            }
        }
    }

    let drift_detected = account
        .map(|account| {
            let account_keys: BTreeSet<&String> = account.keys().collect();
            let cookie_keys: BTreeSet<&String> = cookie.keys().collect();
            account_keys != cookie_keys
        })
        .unwrap_or(false);

    Reconciliation {
        assignment,
        changed,
        drift_detected,
    }
}

fn sample<R: Rng>(domain: &[String], rng: &mut R) -> Option<String> {
    if domain.is_empty() {
        return None;
    }
    Some(domain[rng.gen_range(0..domain.len())].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::catalog::Experiment;

    fn catalog() -> ExperimentCatalog {
        ExperimentCatalog::new(vec![
            Experiment {
                key: "a".into(),
                variants: vec!["x".into(), "y".into()],
            },
            Experiment {
                key: "b".into(),
                variants: vec!["x".into(), "y".into()],
            },
        ])
    }

    fn assignment(pairs: &[(&str, &str)]) -> Assignment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fills_missing_keys_and_converges() {
        let catalog = catalog();
        let mut rng = rand::thread_rng();

        let first = reconcile(&catalog, None, &assignment(&[("a", "x")]), &mut rng);
        assert!(first.changed);
        assert_eq!(first.assignment.len(), 2);
        assert_eq!(first.assignment.get("a"), Some(&"x".to_string()));
        assert!(["x", "y"].contains(&first.assignment["b"].as_str()));

        // feeding the output back as both stores settles the fixed point
        let second = reconcile(
            &catalog,
            Some(&first.assignment),
            &first.assignment,
            &mut rng,
        );
        assert!(!second.changed);
        assert!(!second.drift_detected);
        assert_eq!(second.assignment, first.assignment);
    }

    #[test]
    fn account_wins_key_conflicts() {
        let result = reconcile(
            &catalog(),
            Some(&assignment(&[("a", "y"), ("b", "x")])),
            &assignment(&[("a", "x"), ("b", "x")]),
            &mut rand::thread_rng(),
        );
        assert_eq!(result.assignment.get("a"), Some(&"y".to_string()));
    }

    #[test]
    fn out_of_domain_value_is_reassigned() {
        let result = reconcile(
            &catalog(),
            None,
            &assignment(&[("a", "retired_variant"), ("b", "x")]),
            &mut rand::thread_rng(),
        );
        assert!(result.changed);
        assert!(["x", "y"].contains(&result.assignment["a"].as_str()));
    }

    #[test]
    fn catalog_shrinkage_flags_changed() {
        // every surviving key is valid, only the count differs
        let stored = assignment(&[("a", "x"), ("b", "y"), ("removed", "x")]);
        let result = reconcile(&catalog(), Some(&stored), &stored, &mut rand::thread_rng());
        assert!(result.changed);
        assert_eq!(result.assignment.len(), 2);
        assert!(!result.assignment.contains_key("removed"));
    }

    #[test]
    fn drift_forces_writes_without_changes() {
        let account = assignment(&[("a", "x"), ("b", "y")]);
        let cookie = assignment(&[("a", "x")]);
        let result = reconcile(&catalog(), Some(&account), &cookie, &mut rand::thread_rng());
        assert!(result.drift_detected);
        assert!(result.write_cookie());
    }

    #[test]
    fn anonymous_requests_never_drift() {
        let result = reconcile(
            &catalog(),
            None,
            &assignment(&[("a", "x"), ("b", "y")]),
            &mut rand::thread_rng(),
        );
        assert!(!result.drift_detected);
        assert!(!result.changed);
    }
}
