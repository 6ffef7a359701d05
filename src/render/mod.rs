//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! RenderRequest {state, url, session_token}
//!     → renderer.rs (route resolution, outcome state machine)
//!     → loader.rs (data / metadata callbacks over the dispatch handle)
//!     → state serialization + document assembly
//!     → result.rs (typed RendererResult, wire payload)
//!     → JSON response back to the gateway
//! ```
//!
//! # Design Decisions
//! - Four terminal outcomes, mutually exclusive by construction
//! - Redirect outranks NotFound outranks Success; any failure overrides
//!   all three
//! - A response is never shipped with a tracked operation still pending

pub mod loader;
pub mod renderer;
pub mod result;
pub mod service;

pub use loader::{
    data_loader, metadata_loader, DataLoader, Dispatch, FetchSpec, LoadContext, MetadataLoader,
    ServiceClient,
};
pub use renderer::{view_handler, ViewHandler, ViewRenderer};
pub use result::{ErrorBody, RenderRequest, RendererPayload, RendererResult};
pub use service::RendererService;
