//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route declarations (flat RouteDescriptor list)
//!     → matcher.rs (compile patterns at construction)
//!     → Freeze as immutable RouteTable
//!
//! Incoming path
//!     → router.rs (single ordered scan)
//!     → Return: RouteMatch, wildcard fallback, or explicit no-match
//! ```
//!
//! # Design Decisions
//! - Patterns compiled once at startup, immutable at runtime
//! - Declaration order controls precedence among specific routes
//! - The wildcard never masks a later specific route, wherever declared
//! - Pattern errors are configuration errors, surfaced at construction

pub mod matcher;
pub mod router;

pub use matcher::RoutePatternError;
pub use router::{RouteDescriptor, RouteMatch, RouteParams, RouteTable};
