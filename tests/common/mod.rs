//! Shared utilities for the integration suite: real gateway + renderer
//! pairs on loopback ports, plus a programmable raw renderer for failure
//! injection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use ssr_gateway::config::{ExperimentConfig, GatewayConfig};
use ssr_gateway::error::{RenderError, ServiceError};
use ssr_gateway::gateway::{GatewayServer, MemoryAccountStore};
use ssr_gateway::lifecycle::Shutdown;
use ssr_gateway::render::{
    data_loader, metadata_loader, view_handler, LoadContext, RendererService, ServiceClient,
    ViewRenderer,
};
use ssr_gateway::routing::{RouteDescriptor, RouteParams, RouteTable};

/// Stand-in for the business services invoked by data loaders.
struct StubServices;

impl ServiceClient for StubServices {
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
                    message: "unavailable".to_string(),
                }),
            }
        })
    }
}

/// The route set every integration renderer serves.
pub fn sample_routes() -> Vec<RouteDescriptor> {
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
            "legacy",
            "/legacy",
            view_handler(|_state: &Value, _params: &RouteParams| Ok(String::new())),
        )
        .with_data_loader(data_loader(|ctx: LoadContext| async move {
            ctx.redirect_to("/users/1");
            Ok(())
        })),
        RouteDescriptor::new(
            "broken",
            "/broken",
            view_handler(|_state: &Value, _params: &RouteParams| Ok(String::new())),
        )
        .with_data_loader(data_loader(|ctx: LoadContext| async move {
            ctx.dispatch
                .fetch_into("page/data", "missing_service", &ctx.params)
                .await
        })),
        RouteDescriptor::new(
            "frozen",
            "/frozen",
            view_handler(|_state: &Value, _params: &RouteParams| {
                Ok("<p>should never ship</p>".to_string())
            }),
        )
        .with_data_loader(data_loader(|ctx: LoadContext| async move {
            ctx.dispatch.track_start("page/background");
            Ok(())
        })),
        RouteDescriptor::new(
            "not_found",
            "*",
            view_handler(|_state: &Value, _params: &RouteParams| {
                Ok("<h1>Page not found</h1>".to_string())
            }),
        ),
    ]
}

/// Spawn a real renderer service on `addr`.
#[allow(dead_code)]
pub async fn spawn_renderer(addr: SocketAddr, shutdown: &Shutdown) {
    let routes = Arc::new(RouteTable::new(sample_routes()).unwrap());
    let renderer = Arc::new(ViewRenderer::new(routes, Arc::new(StubServices)));
    let service = RendererService::new(renderer);
    let listener = TcpListener::bind(addr).await.unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = service.run(listener, rx).await;
    });
}

/// Gateway configuration pointed at a renderer on `renderer_addr`, with a
/// two-experiment catalog.
pub fn gateway_config(gateway_addr: SocketAddr, renderer_addr: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = gateway_addr.to_string();
    config.renderer.bind_address = renderer_addr.to_string();
    config.renderer.endpoint = format!("http://{renderer_addr}/render");
    config.observability.metrics_enabled = false;
    config.experiments.catalog = vec![
        ExperimentConfig {
            key: "checkout_flow".to_string(),
            variants: vec!["control".to_string(), "one_page".to_string()],
        },
        ExperimentConfig {
            key: "profile_banner".to_string(),
            variants: vec!["on".to_string(), "off".to_string()],
        },
    ];
    config
}

/// Spawn a gateway server for `config`.
pub async fn spawn_gateway(
    config: GatewayConfig,
    accounts: Arc<MemoryAccountStore>,
    shutdown: &Shutdown,
) {
    let addr: SocketAddr = config.listener.bind_address.parse().unwrap();
    let listener = TcpListener::bind(addr).await.unwrap();
    let rx = shutdown.subscribe();
    let server = GatewayServer::new(config, accounts).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
}

/// Start a programmable raw renderer that answers every request with the
/// produced status and body. Lets tests inject empty, malformed, ambiguous
/// and slow responses below the protocol layer.
#[allow(dead_code)]
pub async fn start_programmable_renderer<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
