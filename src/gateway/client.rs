//! Internal hop to the renderer process.
//!
//! # Responsibilities
//! - Forward `{state, url, session_token}` to the renderer endpoint
//! - Enforce the hop timeout
//! - Decode and validate the typed result
//!
//! # Design Decisions
//! - A timeout or connect failure is a transport failure, never NotFound
//! - "No body and no transport failure" is itself a transport failure —
//!   never an implicit success or not-found

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::{GatewayError, ProtocolError};
use crate::render::result::{RenderRequest, RendererPayload, RendererResult};

/// Upper bound on a renderer response body.
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// HTTP client for the gateway → renderer call.
pub struct RendererClient {
    client: Client<HttpConnector, Body>,
    endpoint: Uri,
    timeout: Duration,
}

impl RendererClient {
    pub fn new(endpoint: Uri, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform one render call.
    pub async fn render(&self, request: &RenderRequest) -> Result<RendererResult, GatewayError> {
        let body = serde_json::to_vec(request)?;
        let req = Request::builder()
            .method(Method::GET)
            .uri(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|e| GatewayError::RendererUnreachable(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| GatewayError::RendererTimeout(self.timeout))?
            .map_err(|e| GatewayError::RendererUnreachable(e.to_string()))?;

        let bytes = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| GatewayError::RendererUnreachable(e.to_string()))?;
        if bytes.is_empty() {
            return Err(GatewayError::EmptyRendererBody);
        }

        let payload: RendererPayload = serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::Protocol(ProtocolError::Decode(e)))?;
        Ok(payload.into_result()?)
    }
}
