//! SSR orchestration and state-synchronization pipeline.
//!
//! Two cooperating processes built from this crate:
//!
//! ```text
//!     Public request
//!          │
//!          ▼
//!     ┌─────────────────────────────────────────────┐
//!     │ gateway (src/main.rs)                        │
//!     │   context extraction · experiment reconcile  │
//!     │   internal hop with timeout                  │──── GET /render ────┐
//!     │   typed-result translation · cookie writes   │                     │
//!     └─────────────────────────────────────────────┘                     ▼
//!                                        ┌─────────────────────────────────────┐
//!                                        │ renderer (src/bin/renderer.rs)       │
//!                                        │   route matching · data loaders      │
//!                                        │   view render · state serialization  │
//!                                        └─────────────────────────────────────┘
//! ```
//!
//! The serialized state travels inside the rendered document and is picked
//! up by the client resume step (`client/`), which attaches to the server
//! markup without redoing work.

// Core pipeline
pub mod config;
pub mod context;
pub mod error;
pub mod experiments;
pub mod routing;
pub mod state;

// Processes
pub mod gateway;
pub mod render;

// Client side
pub mod client;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use gateway::GatewayServer;
pub use lifecycle::Shutdown;
pub use render::{RendererResult, RendererService, ViewRenderer};
pub use state::StateTree;
