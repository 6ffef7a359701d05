//! Error taxonomy for the rendering pipeline.
//!
//! # Responsibilities
//! - Classify failures into render, transport, and invariant classes
//! - Carry enough structure for the gateway's single error-response path
//! - Map each class to a wire identifier and an HTTP status
//!
//! # Design Decisions
//! - Extractor-level problems are not errors: malformed analytics input
//!   recovers to a safe default at the point of parsing and never
//!   propagates
//! - Everything from the page data loader onward becomes a typed
//!   `RendererResult::Error`, so status-code and logging policy live in
//!   exactly one place (the gateway)
//! - Invariant violations are fatal and never downgraded to NotFound

use thiserror::Error;

/// Failures raised inside the renderer while assembling a page.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("data loader failed: {message}")]
    Loader {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("metadata loader failed: {0}")]
    Metadata(String),

    #[error("view handler failed: {0}")]
    View(String),

    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{} tracked operation(s) still pending at render completion", .0.len())]
    PendingOperations(Vec<String>),
}

impl RenderError {
    /// Wire identifier carried in the error payload.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::PendingOperations(_) => "invariant_violation",
            _ => "render_failure",
        }
    }

    /// HTTP status the gateway should answer with.
    pub fn status(&self) -> u16 {
        500
    }

    /// Structured detail for diagnostics. Withheld from responses outside
    /// debug builds.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            RenderError::Loader { details, .. } => details.clone(),
            RenderError::PendingOperations(ids) => {
                Some(serde_json::json!({ "pending": ids }))
            }
            _ => None,
        }
    }
}

/// Failures from the external service collaborator invoked by data loaders.
#[derive(Debug, Error)]
#[error("service call `{resource}` failed: {message}")]
pub struct ServiceError {
    pub resource: String,
    pub message: String,
}

impl From<ServiceError> for RenderError {
    fn from(err: ServiceError) -> Self {
        RenderError::Loader {
            message: err.message.clone(),
            details: Some(serde_json::json!({ "resource": err.resource })),
        }
    }
}

/// Violations of the one-populated-case response contract.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("renderer payload populates no outcome")]
    Empty,

    #[error("renderer payload populates {0} outcomes, expected exactly one")]
    Ambiguous(usize),

    #[error("renderer payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures observed by the gateway on the internal renderer hop.
///
/// Every variant is a transport failure from the caller's point of view:
/// the renderer never produced a usable typed result. A timeout is never
/// reported as NotFound.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("renderer unreachable: {0}")]
    RendererUnreachable(String),

    #[error("renderer timed out after {0:?}")]
    RendererTimeout(std::time::Duration),

    #[error("renderer returned an empty body with no transport error")]
    EmptyRendererBody,

    #[error("render request encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("renderer payload invalid: {0}")]
    Protocol(#[from] ProtocolError),
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        "transport_failure"
    }

    pub fn status(&self) -> u16 {
        match self {
            GatewayError::RendererTimeout(_) => 504,
            _ => 502,
        }
    }
}

/// Errors raised by the client resume step.
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("embedded state payload not found in document")]
    MissingState,

    #[error("embedded state payload malformed: {0}")]
    MalformedState(#[from] serde_json::Error),

    #[error("no route matches `{0}`")]
    NoRoute(String),

    #[error("route code for `{route_id}` failed to load: {message}")]
    CodeLoad { route_id: String, message: String },

    #[error("attach to server markup failed: {0}")]
    Attach(String),

    #[error("version probe failed: {0}")]
    VersionProbe(String),
}
