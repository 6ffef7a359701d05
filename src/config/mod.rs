//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared by value/Arc with both binaries
//! ```
//!
//! # Design Decisions
//! - Configuration is immutable after startup; no cross-request mutable
//!   state beyond it
//! - All fields have defaults so a minimal config works
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CookieConfig, ExperimentConfig, ExperimentsConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, RendererConfig, SessionConfig,
};
