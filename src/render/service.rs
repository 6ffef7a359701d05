//! Renderer-side HTTP service.
//!
//! # Responsibilities
//! - Serve the internal render endpoint the gateway forwards to
//! - Decode `RenderRequest`, drive the view renderer, encode the payload
//! - Expose a liveness probe
//!
//! # Design Decisions
//! - The response body is always a JSON-encoded `RendererPayload`; the
//!   HTTP status of the hop stays 200 even for Error outcomes, which
//!   travel inside the protocol

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::render::renderer::ViewRenderer;
use crate::render::result::{RenderRequest, RendererPayload};
use crate::state::StateTree;

#[derive(Clone)]
struct ServiceState {
    renderer: Arc<ViewRenderer>,
}

/// The renderer process's HTTP surface.
pub struct RendererService {
    router: Router,
}

impl RendererService {
    pub fn new(renderer: Arc<ViewRenderer>) -> Self {
        let state = ServiceState { renderer };
        let router = Router::new()
            .route("/render", get(render_endpoint))
            .route("/healthz", get(healthz))
            .with_state(state)
            .layer(TraceLayer::new_for_http());
        Self { router }
    }

    /// The assembled router, for embedding in tests.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "renderer listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("renderer stopped");
        Ok(())
    }
}

async fn render_endpoint(
    State(state): State<ServiceState>,
    Json(request): Json<RenderRequest>,
) -> Json<RendererPayload> {
    let RenderRequest {
        state: initial,
        url,
        session_token,
    } = request;

    tracing::debug!(
        url = %url,
        authenticated = session_token.is_some(),
        "render requested"
    );

    let result = state
        .renderer
        .render(&url, StateTree::from_value(initial))
        .await;
    Json(RendererPayload::from(result))
}

async fn healthz() -> &'static str {
    "ok"
}
