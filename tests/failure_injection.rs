//! Failure injection against the internal gateway → renderer hop.
//!
//! A raw programmable renderer stands in for the real one so the tests can
//! produce bodies the protocol layer must reject.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ssr_gateway::gateway::MemoryAccountStore;
use ssr_gateway::lifecycle::Shutdown;

mod common;

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn spawn_gateway_at(gateway: &str, renderer: &str, timeout_ms: u64) -> Shutdown {
    let gateway_addr: SocketAddr = gateway.parse().unwrap();
    let renderer_addr: SocketAddr = renderer.parse().unwrap();

    let mut config = common::gateway_config(gateway_addr, renderer_addr);
    config.renderer.timeout_ms = timeout_ms;

    let shutdown = Shutdown::new();
    common::spawn_gateway(config, Arc::new(MemoryAccountStore::new()), &shutdown).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown
}

#[tokio::test]
async fn empty_renderer_body_is_a_transport_failure() {
    let renderer_addr: SocketAddr = "127.0.0.1:28502".parse().unwrap();
    common::start_programmable_renderer(renderer_addr, || async { (200, String::new()) }).await;
    let shutdown = spawn_gateway_at("127.0.0.1:28501", "127.0.0.1:28502", 5_000).await;

    let res = client()
        .get("http://127.0.0.1:28501/")
        .send()
        .await
        .expect("gateway unreachable");

    // never an implicit success or not-found
    assert_eq!(res.status(), 502);
    assert_eq!(
        res.headers().get("x-renderer-response-type").unwrap(),
        "error"
    );
    let body = res.text().await.unwrap();
    assert!(body.contains("data-error-kind=\"transport_failure\""));

    shutdown.trigger();
}

#[tokio::test]
async fn malformed_renderer_payload_is_a_transport_failure() {
    let renderer_addr: SocketAddr = "127.0.0.1:28512".parse().unwrap();
    common::start_programmable_renderer(renderer_addr, || async {
        (200, "this is not json".to_string())
    })
    .await;
    let shutdown = spawn_gateway_at("127.0.0.1:28511", "127.0.0.1:28512", 5_000).await;

    let res = client()
        .get("http://127.0.0.1:28511/")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    shutdown.trigger();
}

#[tokio::test]
async fn ambiguous_renderer_payload_is_rejected() {
    let renderer_addr: SocketAddr = "127.0.0.1:28522".parse().unwrap();
    common::start_programmable_renderer(renderer_addr, || async {
        (
            200,
            r#"{"html":"<p>ok</p>","redirect_url":"/elsewhere"}"#.to_string(),
        )
    })
    .await;
    let shutdown = spawn_gateway_at("127.0.0.1:28521", "127.0.0.1:28522", 5_000).await;

    let res = client()
        .get("http://127.0.0.1:28521/")
        .send()
        .await
        .unwrap();

    // two populated outcomes violate the protocol, whatever they are
    assert_eq!(res.status(), 502);
    let body = res.text().await.unwrap();
    assert!(body.contains("data-error-kind=\"transport_failure\""));
    assert!(!body.contains("<p>ok</p>"));

    shutdown.trigger();
}

#[tokio::test]
async fn renderer_timeout_is_504_not_404() {
    let renderer_addr: SocketAddr = "127.0.0.1:28532".parse().unwrap();
    common::start_programmable_renderer(renderer_addr, || async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, r#"{"html":"<p>too late</p>"}"#.to_string())
    })
    .await;
    let shutdown = spawn_gateway_at("127.0.0.1:28531", "127.0.0.1:28532", 500).await;

    let res = client()
        .get("http://127.0.0.1:28531/")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 504);
    assert_eq!(
        res.headers().get("x-renderer-response-type").unwrap(),
        "error"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_renderer_is_502() {
    // nothing listens on the renderer port
    let shutdown = spawn_gateway_at("127.0.0.1:28541", "127.0.0.1:28542", 1_000).await;

    let res = client()
        .get("http://127.0.0.1:28541/users/42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    shutdown.trigger();
}

#[tokio::test]
async fn renderer_error_payload_keeps_kind_and_status() {
    let renderer_addr: SocketAddr = "127.0.0.1:28552".parse().unwrap();
    common::start_programmable_renderer(renderer_addr, || async {
        (
            200,
            r#"{"error":{"kind":"render_failure","message":"profile service unavailable","status":503}}"#
                .to_string(),
        )
    })
    .await;
    let shutdown = spawn_gateway_at("127.0.0.1:28551", "127.0.0.1:28552", 5_000).await;

    let res = client()
        .get("http://127.0.0.1:28551/")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    let body = res.text().await.unwrap();
    assert!(body.contains("data-error-kind=\"render_failure\""));
    assert!(body.contains("profile service unavailable"));

    shutdown.trigger();
}
