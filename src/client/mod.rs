//! Client resume subsystem.
//!
//! # Data Flow
//! ```text
//! Served document
//!     → resume.rs (parse embedded state, rebuild the state tree)
//!     → route resolution + lazy code loading (RouteReady)
//!     → attach to existing server markup (ViewAnchor)
//!     → store.rs (observable ClientStore for post-resume mutations)
//!
//! Independently:
//!     version_check.rs (advisory background timer, visibility-gated)
//! ```
//!
//! # Design Decisions
//! - Lazy code loading and DOM attachment are runtime capabilities behind
//!   traits, so the core logic tests without a bundler or browser
//! - Attachment reuses server markup; a fresh mount would redo work and
//!   flash the page
//! - Subscriptions exist only on this side; the render path never needs
//!   them

pub mod resume;
pub mod store;
pub mod version_check;

pub use resume::{parse_embedded_state, ResumeStep, RouteReady, ViewAnchor};
pub use store::{ClientStore, SubscriptionId};
pub use version_check::{VersionChecker, VersionProbe, VisibilitySource};
