//! Gateway HTTP server.
//!
//! # Responsibilities
//! - Terminate public requests on a catch-all route
//! - Build the per-request context (analytics, UTM, user-agent,
//!   experiments) and forward it to the renderer
//! - Translate the typed renderer result into an HTTP response
//! - Flush queued cookie writes, record response metadata and metrics
//!
//! # Design Decisions
//! - Middleware stack: request timeout, request id, trace
//! - Every error response leaves through `error_response`; `details`
//!   never leaks outside debug builds
//! - Response type and render latency are recorded as headers and
//!   metrics on every exit path

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::InvalidUri, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::config::{CookieConfig, GatewayConfig};
use crate::context::cookies::{queue_json_cookie, read_json_cookie, CookieJar};
use crate::context::extractor::{apply_to_state, Extractor, RequestParts};
use crate::experiments::{reconcile, Assignment, ExperimentCatalog};
use crate::gateway::accounts::AccountStore;
use crate::gateway::client::RendererClient;
use crate::observability::metrics;
use crate::render::result::{RenderRequest, RendererResult};
use crate::state::StateTree;

/// Header carrying the renderer outcome class.
pub const X_RENDERER_RESPONSE_TYPE: &str = "x-renderer-response-type";
/// Header carrying the render latency in milliseconds.
pub const X_RENDERER_RESPONSE_TIME_MS: &str = "x-renderer-response-time-ms";
/// Correlation id header.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<RendererClient>,
    pub accounts: Arc<dyn AccountStore>,
    pub catalog: Arc<ExperimentCatalog>,
    pub extractor: Arc<Extractor>,
    pub cookies: CookieConfig,
}

/// The public-facing gateway server.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Assemble the server from validated configuration.
    pub fn new(
        config: GatewayConfig,
        accounts: Arc<dyn AccountStore>,
    ) -> Result<Self, InvalidUri> {
        let endpoint = config.renderer.endpoint.parse()?;
        let renderer = Arc::new(RendererClient::new(
            endpoint,
            Duration::from_millis(config.renderer.timeout_ms),
        ));
        let extractor = Arc::new(Extractor::new(
            config.cookies.clone(),
            Duration::from_secs(config.session.new_session_window_mins * 60),
        ));
        let catalog = Arc::new(ExperimentCatalog::from_config(&config.experiments.catalog));

        let state = AppState {
            renderer,
            accounts,
            catalog,
            extractor,
            cookies: config.cookies.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", get(render_handler))
            .route("/", get(render_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(middleware::from_fn(assign_request_id))
            .layer(TraceLayer::new_for_http())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "gateway listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("gateway stopped");
        Ok(())
    }
}

/// Ensure every request carries a correlation id, and echo it back.
async fn assign_request_id(mut request: Request<Body>, next: Next) -> Response {
    let id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&id) {
        request.headers_mut().insert(X_REQUEST_ID, value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert(X_REQUEST_ID, value);
        return response;
    }
    next.run(request).await
}

/// Main gateway handler: context → reconcile → forward → translate.
async fn render_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let method = request.method().to_string();

    tracing::debug!(request_id = %request_id, url = %url, "rendering request");

    let headers = request.headers();
    let mut jar = CookieJar::from_header(
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok()),
    );
    let parts = RequestParts {
        query: request.uri().query(),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok()),
        forwarded_for: headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()),
    };

    let mut context = state
        .extractor
        .extract(&parts, &mut jar, SystemTime::now());

    // session lookup is opaque; no token or an unknown token means anonymous
    let session_token = jar.get(&state.cookies.session).map(str::to_string);
    let principal = match &session_token {
        Some(token) => state.accounts.lookup_session(token).await,
        None => None,
    };
    let account_assignment = match &principal {
        Some(principal) => {
            state
                .accounts
                .experiment_assignment(&principal.account_id)
                .await
        }
        None => None,
    };
    let cookie_assignment: Assignment =
        read_json_cookie(&jar, &state.cookies.experiments).unwrap_or_default();

    let reconciled = reconcile(
        &state.catalog,
        account_assignment.as_ref(),
        &cookie_assignment,
        &mut rand::thread_rng(),
    );
    if reconciled.write_cookie() {
        queue_json_cookie(&mut jar, &state.cookies.experiments, &reconciled.assignment);
    }
    if let Some(principal) = &principal {
        if reconciled.write_account() {
            state
                .accounts
                .store_experiment_assignment(&principal.account_id, reconciled.assignment.clone())
                .await;
        }
    }
    context.experiment_active_variants = reconciled.assignment;

    let mut tree = StateTree::new();
    apply_to_state(&context, &mut tree);

    let render_request = RenderRequest {
        state: tree.snapshot(),
        url: url.clone(),
        session_token,
    };

    let response = match state.renderer.render(&render_request).await {
        Ok(result) => {
            tracing::debug!(
                request_id = %request_id,
                response_type = result.response_type(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "renderer answered"
            );
            let response_type = result.response_type();
            let response = translate_result(result);
            finalize(response, response_type, &method, start, &jar, &state.cookies)
        }
        Err(error) => {
            tracing::error!(
                request_id = %request_id,
                url = %url,
                error = %error,
                "renderer hop failed"
            );
            let response = error_response(error.status(), error.kind(), &error.to_string(), None);
            finalize(response, "error", &method, start, &jar, &state.cookies)
        }
    };

    response
}

/// Translate the typed result into the public HTTP response.
fn translate_result(result: RendererResult) -> Response {
    match result {
        RendererResult::Success { html } => (StatusCode::OK, Html(html)).into_response(),
        RendererResult::Redirect { url } => {
            let mut response = StatusCode::FOUND.into_response();
            if let Ok(location) = HeaderValue::from_str(&url) {
                response.headers_mut().insert(header::LOCATION, location);
            }
            response
        }
        RendererResult::NotFound { html } => match html {
            Some(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        RendererResult::Error {
            kind,
            message,
            details,
            status,
        } => error_response(status, &kind, &message, details.as_ref()),
    }
}

/// The shared error-response path.
fn error_response(status: u16, kind: &str, message: &str, details: Option<&Value>) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let detail_block = if cfg!(debug_assertions) {
        details
            .map(|d| format!("<pre>{}</pre>", escape_html(&d.to_string())))
            .unwrap_or_default()
    } else {
        String::new()
    };
    let body = format!(
        "<!doctype html>\
<html><head><meta charset=\"utf-8\"><title>Something went wrong</title></head>\
<body><h1>Something went wrong</h1>\
<p data-error-kind=\"{}\">{}</p>{}</body></html>",
        escape_html(kind),
        escape_html(message),
        detail_block
    );

    (status, Html(body)).into_response()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Stamp response metadata, flush cookies, record metrics.
fn finalize(
    mut response: Response,
    response_type: &str,
    method: &str,
    start: Instant,
    jar: &CookieJar,
    cookies: &CookieConfig,
) -> Response {
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if let Ok(value) = HeaderValue::from_str(response_type) {
        response
            .headers_mut()
            .insert(X_RENDERER_RESPONSE_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&elapsed_ms.to_string()) {
        response
            .headers_mut()
            .insert(X_RENDERER_RESPONSE_TIME_MS, value);
    }

    for cookie in jar.set_cookie_headers(cookies) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(error) => {
                tracing::warn!(error = %error, "dropping unencodable cookie write");
            }
        }
    }

    metrics::record_request(method, response.status().as_u16(), response_type, start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn translate_success_and_not_found() {
        let ok = translate_result(RendererResult::Success {
            html: "<p>ok</p>".into(),
        });
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = translate_result(RendererResult::NotFound { html: None });
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn translate_redirect_sets_location() {
        let response = translate_result(RendererResult::Redirect {
            url: "/login".into(),
        });
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login"
        );
    }

    #[test]
    fn translate_error_uses_payload_status() {
        let response = translate_result(RendererResult::Error {
            kind: "render_failure".into(),
            message: "boom".into(),
            details: Some(json!({ "resource": "users/1" })),
            status: 503,
        });
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn finalize_stamps_metadata_and_cookies() {
        let cookies = CookieConfig::default();
        let mut jar = CookieJar::from_header(None);
        jar.queue_write("analytics_session_id", "abc");

        let response = finalize(
            StatusCode::OK.into_response(),
            "success",
            "GET",
            Instant::now(),
            &jar,
            &cookies,
        );
        assert_eq!(
            response.headers().get(X_RENDERER_RESPONSE_TYPE).unwrap(),
            "success"
        );
        assert!(response.headers().contains_key(X_RENDERER_RESPONSE_TIME_MS));
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }
}
