//! Shared state subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (extractor)
//!     → tree.rs (path-addressable StateTree: get / set / commit)
//!     → data loaders mutate through the dispatch handle
//!     → serialize.rs (strip dynamic keys, encode, escape)
//!     → inline <script> payload in the rendered document
//!     → client resume parses it back into an equivalent tree
//! ```
//!
//! # Design Decisions
//! - Explicit snapshot store: the render path needs get/set/serialize,
//!   never subscriptions
//! - Mutations batch until `commit()`; reads observe committed state only
//! - Keys starting with `$` are dynamic/derived and never leave the server

pub mod serialize;
pub mod tree;

pub use serialize::{serialize_state, STATE_GLOBAL};
pub use tree::StateTree;
