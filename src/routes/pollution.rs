use axum::{
    body::Body,
    extract::{Request, State},
    response::Response,
};

use crate::common::AppState;
use crate::error::AppResult;
use crate::routes::rate_limit::peer_ip;

/// Forward any `/pollution` request to the configured pollution API
///
/// Method, path, query and body are passed through; the upstream's status,
/// headers and body come back unchanged.
#[utoipa::path(
    get,
    path = "/pollution",
    responses(
        (status = 200, description = "Upstream response, relayed"),
        (status = 429, description = "Too many proxied requests"),
        (status = 502, description = "Upstream unreachable"),
    ),
    tag = "proxy"
)]
pub async fn forward(State(state): State<AppState>, req: Request<Body>) -> AppResult<Response> {
    let peer = peer_ip(&req);
    state.pollution_proxy.forward(req, peer).await
}
