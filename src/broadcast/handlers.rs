use super::dispatcher::BroadcastDispatcher;
use super::protocol::{CONTENT_TYPE_NDJSON, QUERY_CLUSTER_FILTER};
use super::types::*;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use futures::StreamExt;
use serde_json::{Value, json};
use std::convert::Infallible;

/// `POST /broadcast/buckets/:bucket/tasks/`
pub async fn handle_broadcast_start_task(
    Extension(dispatcher): Extension<BroadcastDispatcher>,
    request_id: Option<Extension<RequestId>>,
    credentials: Option<Extension<Credentials>>,
    Path(bucket): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Rejecting broadcast with malformed JSON body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_json_body" })),
            )
                .into_response();
        }
    };

    let (query, cluster_filter) = split_cluster_filter(params);

    let request = BroadcastRequest {
        bucket,
        body,
        query,
        cluster_filter,
        credentials: credentials.map(|Extension(c)| c),
        request_id: request_id.map(|Extension(id)| id).unwrap_or_default(),
    };

    let lines = dispatcher.dispatch(request).map(Ok::<_, Infallible>);

    (
        [(header::CONTENT_TYPE, CONTENT_TYPE_NDJSON)],
        Body::from_stream(lines),
    )
        .into_response()
}

/// An empty body is treated as an empty object.
fn parse_body(raw: &[u8]) -> serde_json::Result<Value> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(raw)
}

/// Separates the peer-selection filter (`cluster` / `cluster[]`, repeatable)
/// from the query pairs forwarded to peers.
pub fn split_cluster_filter(
    params: Vec<(String, String)>,
) -> (Vec<(String, String)>, Option<Vec<String>>) {
    let mut forwarded = Vec::with_capacity(params.len());
    let mut clusters: Option<Vec<String>> = None;

    for (key, value) in params {
        if key == QUERY_CLUSTER_FILTER || key.strip_suffix("[]") == Some(QUERY_CLUSTER_FILTER) {
            clusters.get_or_insert_with(Vec::new).push(value);
        } else {
            forwarded.push((key, value));
        }
    }

    (forwarded, clusters)
}
