//! Forwarding of `/pollution` requests to the pollution API.
//!
//! Requests go upstream with their method, path, query, headers and body
//! intact, except that hop-by-hop headers are dropped and `Host` becomes the
//! upstream's own authority. Bodies are streamed both ways. No retries.

use std::net::IpAddr;
use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    response::Response,
};
use reqwest::{Client, Url};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Path prefix handled by the proxy.
pub const POLLUTION_PREFIX: &str = "/pollution";

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

pub struct PollutionProxy {
    http_client: Client,
    upstream: Url,
}

impl PollutionProxy {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.pollution_timeout_seconds))
            // Redirects are the client's business, not the proxy's.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            upstream: config.pollution_upstream_url.clone(),
        })
    }

    #[must_use]
    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Upstream URL for a request path, keeping any base path of the upstream.
    #[must_use]
    pub fn target_url(&self, path_and_query: &str) -> String {
        let base = self.upstream.as_str().trim_end_matches('/');
        format!("{base}{path_and_query}")
    }

    /// Forward `req` upstream and relay the answer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the upstream cannot be reached.
    pub async fn forward(&self, req: Request<Body>, client_ip: Option<IpAddr>) -> AppResult<Response> {
        let (parts, body) = req.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or(POLLUTION_PREFIX, |pq| pq.as_str());
        let url = self.target_url(path_and_query);

        let headers = upstream_headers(&parts.headers, client_ip, parts.uri.scheme_str());

        tracing::debug!(method = %parts.method, url = %url, "forwarding pollution request");

        let mut request = self.http_client.request(parts.method, &url).headers(headers);
        if !body.is_end_stream() {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream_response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Request failed: {e}")))?;

        let status = upstream_response.status();
        tracing::debug!(status = status.as_u16(), url = %url, "pollution upstream answered");

        let mut response = Response::builder().status(status);
        if let Some(headers) = response.headers_mut() {
            copy_end_to_end(upstream_response.headers(), headers, &[]);
        }

        response
            .body(Body::from_stream(upstream_response.bytes_stream()))
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Header names the sender listed in `Connection`; these are hop-by-hop too.
fn connection_tokens(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

/// Copy `source` into `target`, leaving out every hop-by-hop header.
fn copy_end_to_end(source: &HeaderMap, target: &mut HeaderMap, skip: &[HeaderName]) {
    let listed = connection_tokens(source);
    for (name, value) in source {
        if is_hop_by_hop(name) || listed.contains(name) || skip.contains(name) {
            continue;
        }
        target.append(name.clone(), value.clone());
    }
}

/// Headers to send upstream: everything end-to-end except `Host`, plus
/// `X-Forwarded-*`.
fn upstream_headers(
    incoming: &HeaderMap,
    client_ip: Option<IpAddr>,
    scheme: Option<&str>,
) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(incoming.len() + 3);
    copy_end_to_end(incoming, &mut headers, &[header::HOST]);

    if let Some(ip) = client_ip {
        let chain = match incoming.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) => format!("{prior}, {ip}"),
            None => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if let Some(host) = incoming.get(header::HOST) {
        headers.insert(X_FORWARDED_HOST, host.clone());
    }

    headers.insert(
        X_FORWARDED_PROTO,
        HeaderValue::from_static(if scheme == Some("https") { "https" } else { "http" }),
    );

    headers
}
