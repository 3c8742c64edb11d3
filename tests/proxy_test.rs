//! Tests for the `/pollution` reverse proxy against a local upstream.
//!
//! Run with: cargo test --test proxy_test

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use http_body_util::BodyExt;
use reqwest::Url;
use tokio::net::TcpListener;
use tower::ServiceExt;

use pollution_dashboard::common::AppState;
use pollution_dashboard::config::Config;
use pollution_dashboard::routes::build_router;
use pollution_dashboard::source::StaticSource;

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> impl IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    (
        [("x-upstream", "pollution")],
        Json(serde_json::json!({
            "method": method.as_str(),
            "uri": uri.to_string(),
            "host": header("host"),
            "forwarded_host": header("x-forwarded-host"),
            "forwarded_for": header("x-forwarded-for"),
            "api_key": header("x-api-key"),
            "body": body,
        })),
    )
}

async fn upload_size(body: Body) -> String {
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes.len().to_string(),
        Err(e) => e.to_string(),
    }
}

/// Start an upstream on an ephemeral port and return its address.
async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/pollution/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
        .route("/pollution/upload", post(upload_size))
        .fallback(echo);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn app_for(upstream: SocketAddr, configure: impl FnOnce(&mut Config)) -> Router {
    let mut config = Config {
        pollution_upstream_url: Url::parse(&format!("http://{upstream}")).unwrap(),
        disable_rate_limiting: true,
        ..Config::default()
    };
    configure(&mut config);
    let state = AppState::new(config, Arc::new(StaticSource::sample().unwrap())).unwrap();
    build_router(state)
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn forwards_method_path_query_and_body() {
    let upstream = spawn_upstream().await;
    let app = app_for(upstream, |_| {});

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/pollution/readings?station=3&limit=10")
                .header(header::HOST, "dashboard.local:3000")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-api-key", "secret")
                .body(Body::from(r#"{"pm25": 12}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-upstream"], "pollution");

    let json = body_json(response).await;
    assert_eq!(json["method"], "POST");
    assert_eq!(json["uri"], "/pollution/readings?station=3&limit=10");
    assert_eq!(json["host"], upstream.to_string());
    assert_eq!(json["forwarded_host"], "dashboard.local:3000");
    assert_eq!(json["api_key"], "secret");
    assert_eq!(json["body"], r#"{"pm25": 12}"#);
}

#[tokio::test]
async fn large_bodies_are_streamed_through() {
    let upstream = spawn_upstream().await;
    let app = app_for(upstream, |_| {});

    let payload = vec![b'x'; 2 * 1024 * 1024];
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/pollution/upload")
                .header(header::CONTENT_LENGTH, payload.len())
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes, (2 * 1024 * 1024).to_string().as_bytes());
}

#[tokio::test]
async fn preflight_requests_reach_the_upstream() {
    let upstream = spawn_upstream().await;
    let app = app_for(upstream, |_| {});

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/pollution/latest")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    let json = body_json(response).await;
    assert_eq!(json["method"], "OPTIONS");
}

#[tokio::test]
async fn local_routes_still_answer_cors() {
    let upstream = spawn_upstream().await;
    let app = app_for(upstream, |_| {});

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/metrics")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn bare_prefix_is_forwarded_too() {
    let upstream = spawn_upstream().await;
    let app = app_for(upstream, |_| {});

    let response = app
        .oneshot(Request::builder().uri("/pollution").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["method"], "GET");
    assert_eq!(json["uri"], "/pollution");
}

#[tokio::test]
async fn similar_paths_are_not_proxied() {
    let upstream = spawn_upstream().await;
    let app = app_for(upstream, |_| {});

    let response = app
        .oneshot(Request::builder().uri("/pollutionx").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upstream_status_is_relayed() {
    let upstream = spawn_upstream().await;
    let app = app_for(upstream, |_| {});

    let response = app
        .oneshot(Request::builder().uri("/pollution/teapot").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
}

#[tokio::test]
async fn unreachable_upstream_is_a_bad_gateway() {
    // Reserve a port, then free it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let app = app_for(dead, |_| {});
    let response = app
        .oneshot(Request::builder().uri("/pollution/latest").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("Upstream error"));
}

#[tokio::test]
async fn proxy_is_rate_limited_per_client() {
    let upstream = spawn_upstream().await;
    let app = app_for(upstream, |config| {
        config.disable_rate_limiting = false;
        config.rate_limit_proxy_per_second = 60;
        config.rate_limit_proxy_burst = 1;
    });

    let request = || {
        Request::builder()
            .uri("/pollution/latest")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    // Local routes are never limited.
    let chart = app
        .oneshot(Request::builder().uri("/api/chart").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(chart.status(), StatusCode::OK);
}
