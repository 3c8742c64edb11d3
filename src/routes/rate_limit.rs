use axum::extract::ConnectInfo;
use axum::http::Request;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower_governor::{key_extractor::KeyExtractor, GovernorError};

/// Best guess at the caller's address: X-Forwarded-For, then X-Real-IP,
/// then the socket peer.
pub fn client_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    // First hop of X-Forwarded-For (set by reverse proxies in front of us)
    if let Some(ip) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    peer_ip(req)
}

/// Socket peer address, present when served with connect info.
pub fn peer_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

/// Rate-limit key for the proxy routes.
///
/// Requests without any identifiable address (Docker, tests) share the
/// localhost bucket instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackIpKeyExtractor;

impl KeyExtractor for FallbackIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req).unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)))
    }
}
