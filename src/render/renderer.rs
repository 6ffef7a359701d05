//! The view renderer state machine.
//!
//! # Responsibilities
//! - Resolve the requested path against the route table
//! - Drive the loading phase and map its outcome to a terminal state
//! - Assemble the final document: rendered markup plus the embedded
//!   state payload
//!
//! # Design Decisions
//! - Priority: explicit redirect > NotFound > Success; any failure at any
//!   stage overrides all three and yields Error
//! - Success is refused while a tracked operation is still pending; that
//!   violation is fatal and never downgraded to NotFound or a partial page
//! - The render-to-markup primitive is an external collaborator behind
//!   `ViewHandler`

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::RenderError;
use crate::render::loader::{load_page, Dispatch, PageOutcome, ServiceClient};
use crate::render::result::RendererResult;
use crate::routing::{RouteMatch, RouteParams, RouteTable};
use crate::state::serialize::{serialize_state, STATE_GLOBAL};
use crate::state::StateTree;

/// External collaborator that turns assembled state into markup.
pub trait ViewHandler: Send + Sync {
    fn render(&self, state: &Value, params: &RouteParams) -> Result<String, RenderError>;
}

/// Wrap a plain function as a view handler.
pub fn view_handler<F>(f: F) -> Arc<dyn ViewHandler>
where
    F: Fn(&Value, &RouteParams) -> Result<String, RenderError> + Send + Sync + 'static,
{
    struct FnHandler<F>(F);

    impl<F> ViewHandler for FnHandler<F>
    where
        F: Fn(&Value, &RouteParams) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        fn render(&self, state: &Value, params: &RouteParams) -> Result<String, RenderError> {
            (self.0)(state, params)
        }
    }

    Arc::new(FnHandler(f))
}

/// Produces one of four typed outcomes from a render request.
pub struct ViewRenderer {
    routes: Arc<RouteTable>,
    services: Arc<dyn ServiceClient>,
}

impl ViewRenderer {
    pub fn new(routes: Arc<RouteTable>, services: Arc<dyn ServiceClient>) -> Self {
        Self { routes, services }
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// Render `url` over the forwarded state. Never fails: every failure
    /// becomes the Error outcome.
    pub async fn render(&self, url: &str, state: StateTree) -> RendererResult {
        let path = url.split(['?', '#']).next().unwrap_or("/");

        let Some(matched) = self.routes.resolve(path) else {
            tracing::warn!(path = %path, "no route matched and no wildcard declared");
            return RendererResult::NotFound { html: None };
        };
        tracing::debug!(
            path = %path,
            route = %matched.descriptor.id,
            is_not_found = matched.is_not_found,
            "route resolved"
        );

        let dispatch = Dispatch::new(Arc::new(Mutex::new(state)), self.services.clone());

        let outcome = match load_page(&matched, &dispatch).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(
                    route = %matched.descriptor.id,
                    error = %error,
                    "page load failed"
                );
                return RendererResult::from_render_error(&error);
            }
        };

        match outcome {
            PageOutcome::Redirect(url) => {
                tracing::debug!(route = %matched.descriptor.id, location = %url, "redirect raised");
                RendererResult::Redirect { url }
            }
            PageOutcome::NotFound => match self.render_not_found(&dispatch, &matched) {
                Ok(html) => RendererResult::NotFound { html },
                Err(error) => {
                    tracing::error!(error = %error, "not-found page failed to render");
                    RendererResult::from_render_error(&error)
                }
            },
            PageOutcome::Loaded => match self.render_success(&dispatch, &matched) {
                Ok(html) => RendererResult::Success { html },
                Err(error) => {
                    tracing::error!(
                        route = %matched.descriptor.id,
                        error = %error,
                        "render failed"
                    );
                    RendererResult::from_render_error(&error)
                }
            },
        }
    }

    fn render_success(
        &self,
        dispatch: &Dispatch,
        matched: &RouteMatch,
    ) -> Result<String, RenderError> {
        // never ship a response frozen mid-load
        let pending = dispatch.pending_operations();
        if !pending.is_empty() {
            return Err(RenderError::PendingOperations(pending));
        }

        let snapshot = dispatch.snapshot();
        let payload = serialize_state(&snapshot)?;
        let body = matched
            .descriptor
            .handler
            .render(&snapshot, &matched.params)?;
        Ok(compose_document(&body, page_title(&snapshot), &payload))
    }

    fn render_not_found(
        &self,
        dispatch: &Dispatch,
        matched: &RouteMatch,
    ) -> Result<Option<String>, RenderError> {
        let Some(fallback) = self.routes.wildcard() else {
            return Ok(None);
        };
        let snapshot = dispatch.snapshot();
        let payload = serialize_state(&snapshot)?;
        let body = fallback.handler.render(&snapshot, &matched.params)?;
        Ok(Some(compose_document(
            &body,
            page_title(&snapshot),
            &payload,
        )))
    }
}

fn page_title(snapshot: &Value) -> Option<&str> {
    snapshot
        .pointer("/page/metadata/title")
        .and_then(Value::as_str)
}

fn compose_document(body: &str, title: Option<&str>, state_payload: &str) -> String {
    format!(
        "<!doctype html>\
<html><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>{}</title>\
</head><body>\
<div id=\"app\">{}</div>\
<script>window.{} = {};</script>\
</body></html>",
        escape_html(title.unwrap_or("")),
        body,
        STATE_GLOBAL,
        state_payload
    )
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
