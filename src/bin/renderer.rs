//! Renderer process.
//!
//! Serves the internal render endpoint the gateway forwards to. The route
//! set and the profile service below are the demo wiring; deployments
//! register their own routes and plug a real service client.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use ssr_gateway::config::{load_config, GatewayConfig};
use ssr_gateway::error::{RenderError, ServiceError};
use ssr_gateway::lifecycle::Shutdown;
use ssr_gateway::observability::logging;
use ssr_gateway::render::{
    data_loader, metadata_loader, view_handler, LoadContext, RendererService, ServiceClient,
    ViewRenderer,
};
use ssr_gateway::routing::{RouteDescriptor, RouteParams, RouteTable};

#[derive(Parser)]
#[command(name = "renderer")]
#[command(about = "Internal SSR renderer", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the renderer bind address from the config.
    #[arg(long)]
    bind: Option<String>,
}

/// In-process stand-in for the CRUD/business services a deployment wires
/// into data loaders.
struct ProfileService;

impl ServiceClient for ProfileService {
    fn fetch(
        &self,
        resource: String,
        params: RouteParams,
    ) -> BoxFuture<'static, Result<Value, ServiceError>> {
        Box::pin(async move {
            match resource.as_str() {
                "user" => {
                    let id = params.get("id").cloned().unwrap_or_default();
                    Ok(json!({ "id": id, "name": format!("User {id}") }))
                }
                other => Err(ServiceError {
                    resource: other.to_string(),
                    message: "unknown resource".to_string(),
                }),
            }
        })
    }
}

fn route_set() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new(
            "home",
            "/",
            view_handler(|_state: &Value, _params: &RouteParams| {
                Ok("<h1>Welcome</h1>".to_string())
            }),
        ),
        RouteDescriptor::new(
            "user",
            "/users/:id",
            view_handler(|state: &Value, _params: &RouteParams| {
                let name = state
                    .pointer("/page/user/name")
                    .and_then(Value::as_str)
                    .unwrap_or("nobody");
                Ok(format!("<h1>{name}</h1>"))
            }),
        )
        .with_data_loader(data_loader(|ctx: LoadContext| async move {
            ctx.dispatch
                .fetch_into("page/user", "user", &ctx.params)
                .await
        }))
        .with_metadata_loader(metadata_loader(
            |state: Value, _params: RouteParams| async move {
                let name = state
                    .pointer("/page/user/name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                Ok::<_, RenderError>(json!({ "title": format!("{name} | Profiles") }))
            },
        )),
        RouteDescriptor::new(
            "not_found",
            "*",
            view_handler(|_state: &Value, _params: &RouteParams| {
                Ok("<h1>Page not found</h1>".to_string())
            }),
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.renderer.bind_address = bind;
    }

    logging::init_tracing(&format!(
        "ssr_gateway={},tower_http=info",
        config.observability.log_level
    ));

    let routes = Arc::new(RouteTable::new(route_set())?);
    tracing::info!(
        bind_address = %config.renderer.bind_address,
        routes = routes.len(),
        "renderer starting"
    );

    let renderer = Arc::new(ViewRenderer::new(routes, Arc::new(ProfileService)));
    let service = RendererService::new(renderer);

    let listener = TcpListener::bind(&config.renderer.bind_address).await?;
    let shutdown = Shutdown::with_ctrl_c();
    service.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
