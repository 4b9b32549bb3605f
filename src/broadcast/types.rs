use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Same unreserved set as `encodeURIComponent`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Identity a peer reports in the `X-Postable-Cluster-ID` header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ClusterId(pub String);

impl ClusterId {
    /// Generates a random UUID v4-based identity.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ClusterId {
    fn default() -> Self {
        Self::new()
    }
}

/// Basic-auth credentials of the caller, replayed on every peer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Correlation token attached to the inbound request and forwarded to peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// Base URI of one peer cluster, normalised without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerTarget {
    pub base_uri: String,
}

impl PeerTarget {
    /// Normalises a configured URI. Returns `None` for blank entries.
    pub fn parse(raw: &str) -> Option<Self> {
        let base_uri = raw.trim().trim_end_matches('/').trim();
        if base_uri.is_empty() {
            None
        } else {
            Some(Self {
                base_uri: base_uri.to_string(),
            })
        }
    }

    /// Parses a `;`-separated list, dropping blank entries.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(';').filter_map(Self::parse).collect()
    }

    /// The peer's "start task" endpoint for `bucket`.
    pub fn start_task_url(&self, bucket: &str) -> String {
        let mut url = self.base_uri.clone();
        url.push_str("/buckets/");
        url.extend(utf8_percent_encode(bucket, PATH_SEGMENT));
        url.push_str("/tasks/");
        url
    }
}

/// Everything a peer call needs to replay one inbound broadcast.
///
/// Built once per inbound request and shared read-only between all peer
/// calls of that broadcast.
#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    pub bucket: String,
    pub body: Value,
    /// Query pairs forwarded verbatim, peer-selection filter removed.
    pub query: Vec<(String, String)>,
    /// Peer-selection filter. Only changes the advertised count.
    pub cluster_filter: Option<Vec<String>>,
    pub credentials: Option<Credentials>,
    pub request_id: RequestId,
}

/// Terminal classification of one peer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// 200 with an identity header; body streamed as records.
    Success,
    /// 204, nothing forwarded.
    EmptySuccess,
    /// 200 without an identity header.
    MissingIdentity,
    /// Any status other than 200/204.
    UnsuccessfulStatus(u16),
    /// Transport failure before the response completed normally.
    Unreachable,
}

impl CallOutcome {
    /// Classifies a response head.
    pub fn classify(status: u16, cluster_id: Option<&ClusterId>) -> Self {
        match (status, cluster_id) {
            (200, Some(_)) => Self::Success,
            (200, None) => Self::MissingIdentity,
            (204, _) => Self::EmptySuccess,
            (other, _) => Self::UnsuccessfulStatus(other),
        }
    }

    /// Status reported in the error record; `last_status` is the last head seen.
    pub fn reported_status(&self, last_status: u16) -> u16 {
        match self {
            Self::MissingIdentity => 0,
            Self::UnsuccessfulStatus(status) => *status,
            _ => last_status,
        }
    }

    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::Success | Self::EmptySuccess => None,
            Self::MissingIdentity => Some(super::protocol::ERROR_NO_CLUSTER_ID),
            Self::UnsuccessfulStatus(_) => Some(super::protocol::ERROR_UNSUCCESSFUL_STATUS),
            Self::Unreachable => Some(super::protocol::ERROR_CALLING_RECEIVER),
        }
    }
}

/// Per-call bookkeeping. Owned by a single `PeerCall`.
#[derive(Debug, Clone)]
pub struct PeerCallState {
    pub target: PeerTarget,
    /// Last HTTP status seen, `0` until a response head arrives.
    pub status: u16,
    pub cluster_id: Option<ClusterId>,
    pub transport_failed: bool,
    pub terminal: bool,
}

impl PeerCallState {
    pub fn new(target: PeerTarget) -> Self {
        Self {
            target,
            status: 0,
            cluster_id: None,
            transport_failed: false,
            terminal: false,
        }
    }
}
