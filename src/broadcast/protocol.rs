//! Wire Protocol Definitions
//!
//! Header names, error descriptions and the synthesized record shapes written
//! to the aggregate NDJSON stream. Peer-supplied records are forwarded as raw
//! `serde_json::Value`s and are not modelled here.

use super::types::ClusterId;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_BROADCAST_START_TASK: &str = "/broadcast/buckets/:bucket/tasks/";

pub const HEADER_CLUSTER_ID: &str = "x-postable-cluster-id";
pub const HEADER_REQUEST_ID: &str = "request-id";

/// Query parameter naming the peers a caller wants to target.
pub const QUERY_CLUSTER_FILTER: &str = "cluster";

pub const CONTENT_TYPE_NDJSON: &str = "application/x-ndjson";

pub const ERROR_NO_CLUSTER_ID: &str = "connected_with_no_cluster_id";
pub const ERROR_UNSUCCESSFUL_STATUS: &str = "connected_with_unsuccessful_status_code";
pub const ERROR_CALLING_RECEIVER: &str = "error_calling_broadcast_receiver";

/// Field injected into every forwarded peer record.
pub const FIELD_CLUSTER_ID: &str = "clusterId";

/// First line of every broadcast response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MetaLine {
    pub meta: BroadcastMeta,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMeta {
    pub broadcast_clusters: usize,
}

impl MetaLine {
    pub fn new(broadcast_clusters: usize) -> Self {
        Self {
            meta: BroadcastMeta { broadcast_clusters },
        }
    }
}

/// Record emitted when one peer call ends in an error outcome.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLine {
    pub cluster_id: Option<ClusterId>,
    pub meta: ErrorMeta,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorMeta {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    pub status: u16,
    pub description: Option<String>,
}

impl ErrorLine {
    pub fn new(cluster_id: Option<ClusterId>, status: u16, description: Option<&str>) -> Self {
        Self {
            cluster_id,
            meta: ErrorMeta {
                error: ErrorDetail {
                    status,
                    description: description.map(str::to_string),
                },
            },
        }
    }
}
