//! Broadcast Fan-out Module
//!
//! Replicates one "start task" request to every configured peer cluster and
//! streams the merged answers back as newline-delimited JSON.
//!
//! ## Flow
//! 1. **Dispatch**: `BroadcastDispatcher` writes the meta line and spawns one
//!    `PeerCall` per configured peer.
//! 2. **Peer calls**: each call classifies its response head, forwards the
//!    peer's records tagged with its `clusterId`, or writes one error record.
//! 3. **Multiplexing**: all calls write through the shared
//!    `ResponseMultiplexer`, one complete line at a time.
//! 4. **Completion**: every call decrements the shared `CompletionTracker`
//!    exactly once; the last one closes the stream.
//!
//! Peers are not retried and no ordering is kept between them.
//!
//! ## Submodules
//! - **`dispatcher`**: per-request orchestration.
//! - **`peer`**: one outbound call and its outcome classification.
//! - **`ndjson`**: incremental decoding of a peer's response body.
//! - **`tracker`**: exactly-once completion countdown.
//! - **`multiplexer`**: the single writer of the outgoing body.
//! - **`protocol`**: header names, error descriptions and record shapes.
//! - **`handlers`**: the Axum entry point.

pub mod dispatcher;
pub mod handlers;
pub mod multiplexer;
pub mod ndjson;
pub mod peer;
pub mod protocol;
pub mod tracker;
pub mod types;
