//! Request Middleware
//!
//! Applied outermost first:
//! 1. **Request id**: reuses the caller's `request-id` header or mints one,
//!    and runs the rest of the request inside a span carrying it.
//! 2. **Node headers**: `X-Postable-Cluster-ID` and `Connection: close` on
//!    every response.
//! 3. **Basic auth**: only installed when credentials are configured; `/`
//!    stays open for health checks.

use crate::broadcast::protocol::{HEADER_CLUSTER_ID, HEADER_REQUEST_ID};
use crate::broadcast::types::{ClusterId, Credentials, RequestId};

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::Instrument;

pub async fn attach_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| RequestId(value.to_string()))
        .unwrap_or_default();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id.0,
        method = %request.method(),
        uri = %request.uri()
    );

    span.in_scope(|| {
        tracing::debug!(
            "postable_request_received: {} {}",
            request.method(),
            request.uri()
        )
    });

    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        response.headers_mut().insert(HEADER_REQUEST_ID, value);
    }

    response
}

pub async fn set_node_headers(
    State(cluster_id): State<ClusterId>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&cluster_id.0) {
        headers.insert(HEADER_CLUSTER_ID, value);
    }
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

    response
}

pub async fn require_basic_auth(
    State(expected): State<Credentials>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/" {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_auth);

    match presented {
        Some(credentials) if credentials == expected => {
            request.extensions_mut().insert(credentials);
            next.run(request).await
        }
        _ => {
            tracing::warn!("Rejecting request to {} without valid credentials", request.uri());
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"all\"")],
                "Unauthorized",
            )
                .into_response()
        }
    }
}

/// Parses an `Authorization: Basic <base64(user:pass)>` value.
pub fn parse_basic_auth(value: &str) -> Option<Credentials> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}
