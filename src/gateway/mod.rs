//! Gateway subsystem.
//!
//! # Data Flow
//! ```text
//! Public request
//!     → server.rs (axum catch-all, middleware, cookie jar)
//!     → context extraction + experiment reconciliation
//!     → client.rs (internal hop to the renderer, with timeout)
//!     → translate RendererResult into the HTTP response
//!     → flush queued Set-Cookie writes, record metrics
//! ```
//!
//! # Design Decisions
//! - The hop is blocking-with-timeout from the gateway's perspective; a
//!   timeout is a transport failure, never a NotFound
//! - All error responses leave through one shared path
//! - accounts.rs is the opaque session/assignment collaborator

pub mod accounts;
pub mod client;
pub mod server;

pub use accounts::{AccountStore, MemoryAccountStore, Principal};
pub use client::RendererClient;
pub use server::{AppState, GatewayServer};
