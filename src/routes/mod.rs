pub mod chart;
pub mod health;
pub mod pages;
pub mod pollution;
pub mod rate_limit;
pub mod readings;

use axum::{
    routing::{any, get},
    Router,
};
use chrono::FixedOffset;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use rate_limit::FallbackIpKeyExtractor;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;
use crate::config::{offset_from_minutes, Config};
use crate::error::{AppError, AppResult};
use crate::model::Metric;
use crate::proxy::POLLUTION_PREFIX;

/// Parse a metric query parameter. Absent means the default metric;
/// anything outside the known keys is rejected.
pub fn parse_metric(raw: Option<&str>) -> AppResult<Metric> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Metric::default()),
        Some(key) => Ok(key.parse()?),
    }
}

/// Time zone for a request: the client's offset if given, else the configured default.
pub fn resolve_offset(tz_offset: Option<i32>, config: &Config) -> AppResult<FixedOffset> {
    match tz_offset {
        None => Ok(config.default_offset()),
        Some(minutes) => offset_from_minutes(minutes).ok_or_else(|| {
            AppError::BadRequest(format!("tz_offset {minutes} is outside +/-1439 minutes"))
        }),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        chart::get_chart,
        chart::list_metrics,
        chart::list_ranges,
        readings::get_readings,
        pollution::forward,
    ),
    components(
        schemas(
            health::HealthResponse,
            chart::ChartResponse,
            chart::MetricOption,
            chart::RangeOption,
            readings::ReadingsResponse,
            crate::model::Reading,
            crate::model::Metric,
            crate::model::TimeRange,
            crate::model::Selection,
            crate::chart::ChartConfig,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "chart", description = "Chart configuration for the dashboard"),
        (name = "readings", description = "Filtered sensor readings"),
        (name = "proxy", description = "Pass-through to the pollution API"),
    ),
    info(
        title = "Pollution Dashboard API",
        description = "Weather and pollution sensor dashboard",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    tracing::info!(upstream = %state.pollution_proxy.upstream(), "Pollution proxy configured");

    let proxy_routes_base = Router::new()
        .route(POLLUTION_PREFIX, any(pollution::forward))
        .route(&format!("{POLLUTION_PREFIX}/{{*rest}}"), any(pollution::forward));

    // Only the proxy is rate limited: it is the one route that costs the upstream.
    let proxy_routes = if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
        proxy_routes_base
    } else {
        tracing::info!(
            proxy_rate = %format!("{}/s burst {}", config.rate_limit_proxy_per_second, config.rate_limit_proxy_burst),
            "Rate limiting configured"
        );

        let proxy_limiter = GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_second(config.rate_limit_proxy_per_second)
            .burst_size(config.rate_limit_proxy_burst)
            .finish();

        match proxy_limiter {
            Some(limiter) => proxy_routes_base.layer(GovernorLayer {
                config: Arc::new(limiter),
            }),
            None => {
                tracing::error!("Invalid proxy rate limit settings, serving without a limiter");
                proxy_routes_base
            }
        }
    };

    let api_routes = Router::new()
        .route("/chart", get(chart::get_chart))
        .route("/metrics", get(chart::list_metrics))
        .route("/ranges", get(chart::list_ranges))
        .route("/readings", get(readings::get_readings))
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB body limit

    let page_routes = Router::new()
        .route("/", get(pages::home))
        .route("/dashboard", get(pages::dashboard))
        .route("/about", get(pages::about));

    // Health check routes (NO rate limiting)
    let health_routes = Router::new().route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Proxied requests and responses are relayed as-is, so compression and
    // CORS only wrap our own routes.
    let local_routes = Router::new()
        .nest("/api", api_routes)
        .merge(page_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new()
        .merge(local_routes)
        .merge(proxy_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
