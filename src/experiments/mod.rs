//! Experiment assignment subsystem.
//!
//! # Data Flow
//! ```text
//! Config catalog (key → variant domain)
//!     + cookie-held assignment
//!     + account-held assignment (authenticated only)
//!     → reconciler.rs (merge, validate, sample replacements)
//!     → final assignment + changed / drift flags
//!     → gateway queues cookie write and account write as needed
//! ```
//!
//! # Design Decisions
//! - The account copy is authoritative on per-key conflicts
//! - Reassignment is uniform over the declared variant domain
//! - The read-modify-write against the two stores is intentionally
//!   unlocked; repeated application converges to the same fixed point

pub mod catalog;
pub mod reconciler;

pub use catalog::{Experiment, ExperimentCatalog};
pub use reconciler::{reconcile, Assignment, Reconciliation};
