//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Build servers → Bind listeners → Serve
//!
//! Shutdown:
//!     Ctrl+C / trigger() → broadcast → servers drain → tasks exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the signal out to the server loops and
//!   background tasks (version checker)
//! - Both binaries share the same coordinator

pub mod shutdown;

pub use shutdown::Shutdown;
