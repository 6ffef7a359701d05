//! Client-side resume over server-rendered markup.
//!
//! # Responsibilities
//! - Parse the embedded state payload out of the served document
//! - Wait for the matched route's code to be loaded
//! - Attach the view to the existing markup, never fresh-mount
//!
//! # Design Decisions
//! - The payload delimiter is unambiguous: escaping guarantees no
//!   `</script>` sequence can appear inside the embedded JSON
//! - Attachment only happens after every code dependency resolves, to
//!   avoid a visible mismatch between server output and client takeover

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::client::store::ClientStore;
use crate::error::ResumeError;
use crate::routing::{RouteMatch, RouteTable};
use crate::state::serialize::STATE_GLOBAL;
use crate::state::StateTree;

/// Lazy code loading for route-specific bundles.
pub trait RouteReady: Send + Sync {
    fn ensure_route_ready(&self, route_id: &str) -> BoxFuture<'static, Result<(), ResumeError>>;
}

/// The mounted view surface. `attach` reuses existing markup; `mount`
/// builds it fresh and exists for first-renders without server output.
pub trait ViewAnchor: Send + Sync {
    fn attach(&self, state: &StateTree, route: &RouteMatch) -> Result<(), ResumeError>;

    fn mount(&self, state: &StateTree, route: &RouteMatch) -> Result<(), ResumeError>;
}

/// Locate and decode the embedded state payload in a served document.
pub fn parse_embedded_state(document: &str) -> Result<Value, ResumeError> {
    let marker = format!("window.{STATE_GLOBAL} = ");
    let start = document
        .find(&marker)
        .ok_or(ResumeError::MissingState)?
        + marker.len();
    let rest = &document[start..];
    let end = rest
        .find(";</script>")
        .ok_or(ResumeError::MissingState)?;
    Ok(serde_json::from_str(rest[..end].trim())?)
}

/// Resumes the view over server-rendered markup.
pub struct ResumeStep {
    routes: Arc<RouteTable>,
    code: Arc<dyn RouteReady>,
    anchor: Arc<dyn ViewAnchor>,
}

impl ResumeStep {
    pub fn new(
        routes: Arc<RouteTable>,
        code: Arc<dyn RouteReady>,
        anchor: Arc<dyn ViewAnchor>,
    ) -> Self {
        Self {
            routes,
            code,
            anchor,
        }
    }

    /// Pick up exactly where the server left off.
    pub async fn resume(&self, document: &str, path: &str) -> Result<ClientStore, ResumeError> {
        let state = StateTree::from_value(parse_embedded_state(document)?);

        let route = self
            .routes
            .resolve(path)
            .ok_or_else(|| ResumeError::NoRoute(path.to_string()))?;

        // block attachment until all code dependencies resolve
        self.code.ensure_route_ready(&route.descriptor.id).await?;

        self.anchor.attach(&state, &route)?;
        tracing::debug!(route = %route.descriptor.id, "resumed over server markup");
        Ok(ClientStore::new(state))
    }
}
