//! Request handling and transformation.
//!
//! # Responsibilities
//! - Assign a request ID (UUID v4) when the client sent none or sent one that
//!   is not a UUID, and echo it back
//! - Reduce an HTTP request to the resolver's [`Request`]: verb, kind, path,
//!   token and site
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The path is percent-decoded before resolution; rules see readable text
//! - The control panel is selected by the first path segment only

use axum::extract::Request as HttpRequest;
use axum::http::{HeaderMap, HeaderName, Method, Uri};
use axum::middleware::Next;
use axum::response::Response;
use percent_encoding::percent_decode_str;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::schema::RoutingConfig;
use crate::resolution::request::{Request, RequestKind, SiteId};
use crate::routing::rule::Verb;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Header selecting the site a request targets.
pub const X_SITE_ID: &str = "x-site-id";

/// Layer assigning a UUID to requests without an `x-request-id`.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer copying the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// The request id carried in `headers`, or a fresh one.
pub fn request_id(headers: &HeaderMap) -> Uuid {
    header_request_id(headers).unwrap_or_else(Uuid::new_v4)
}

fn header_request_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
}

/// Remove an `x-request-id` that does not parse as a UUID.
///
/// Returns whether a header was removed.
pub fn strip_invalid_request_id(headers: &mut HeaderMap) -> bool {
    if headers.contains_key(X_REQUEST_ID) && header_request_id(headers).is_none() {
        headers.remove(X_REQUEST_ID);
        return true;
    }
    false
}

/// Middleware run ahead of [`set_request_id_layer`], so a malformed client id
/// is replaced and the echoed header matches the id used for resolution.
pub async fn normalize_request_id(mut request: HttpRequest, next: Next) -> Response {
    if strip_invalid_request_id(request.headers_mut()) {
        tracing::debug!("Replacing malformed request id");
    }
    next.run(request).await
}

/// Why an HTTP request cannot be handed to the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    UnsupportedMethod(String),
}

/// Build the resolver view of an HTTP request.
pub fn extract(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    routing: &RoutingConfig,
) -> Result<Request, ExtractError> {
    let verb: Verb = method
        .as_str()
        .parse()
        .map_err(|_| ExtractError::UnsupportedMethod(method.to_string()))?;

    let decoded = percent_decode_str(uri.path()).decode_utf8_lossy();
    let path = decoded.trim_start_matches('/');

    let (kind, path) = match split_first_segment(path) {
        (first, rest) if !routing.cp_trigger.is_empty() && first == routing.cp_trigger => {
            (RequestKind::ControlPanel, rest)
        }
        _ => (RequestKind::Site, path),
    };

    let site_id = headers
        .get(X_SITE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u32>().ok())
        .map(SiteId)
        .unwrap_or(routing.default_site_id);

    let mut request = Request::new(kind, path).with_verb(verb).with_site(site_id);
    if let Some(token) = query_param(uri, &routing.token_param) {
        request = request.with_token(token);
    }
    Ok(request)
}

fn split_first_segment(path: &str) -> (&str, &str) {
    match path.split_once('/') {
        Some((first, rest)) => (first, rest),
        None => (path, ""),
    }
}

fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
