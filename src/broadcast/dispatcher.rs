use super::multiplexer::{BroadcastStream, ResponseMultiplexer};
use super::peer::PeerCall;
use super::protocol::MetaLine;
use super::tracker::CompletionTracker;
use super::types::*;

use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Fans one "start task" request out to every configured peer.
#[derive(Clone)]
pub struct BroadcastDispatcher {
    peers: Arc<Vec<PeerTarget>>,
    http_client: reqwest::Client,
}

impl BroadcastDispatcher {
    pub fn new(peers: Vec<PeerTarget>) -> Self {
        Self::with_client(peers, reqwest::Client::new())
    }

    /// Builds a dispatcher whose peer calls give up after `timeout`.
    pub fn with_timeout(peers: Vec<PeerTarget>, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(peers, http_client))
    }

    pub fn with_client(peers: Vec<PeerTarget>, http_client: reqwest::Client) -> Self {
        Self {
            peers: Arc::new(peers),
            http_client,
        }
    }

    pub fn peers(&self) -> &[PeerTarget] {
        &self.peers
    }

    /// Number of clusters announced in the meta line.
    ///
    /// A cluster filter only changes this number; the fan-out still targets
    /// every configured peer.
    pub fn advertised_count(&self, request: &BroadcastRequest) -> usize {
        match &request.cluster_filter {
            Some(clusters) => clusters.len(),
            None => self.peers.len(),
        }
    }

    /// Writes the meta line, spawns one call per peer and returns the
    /// aggregate stream without waiting for any of them.
    pub fn dispatch(&self, request: BroadcastRequest) -> BroadcastStream {
        let (sink, stream) = ResponseMultiplexer::channel();

        sink.write(&MetaLine::new(self.advertised_count(&request)));

        let close_sink = sink.clone();
        let tracker = CompletionTracker::new(self.peers.len(), move || close_sink.close());

        tracing::info!(
            "Broadcasting bucket '{}' to {} peers",
            request.bucket,
            self.peers.len()
        );

        let request = Arc::new(request);
        for target in self.peers.iter() {
            let span = tracing::info_span!(
                "peer_call",
                request_id = %request.request_id.0,
                peer = %target.base_uri
            );
            let call = PeerCall::new(
                target.clone(),
                request.clone(),
                self.http_client.clone(),
                tracker.clone(),
                sink.clone(),
            );
            tokio::spawn(call.run().instrument(span));
        }

        stream
    }
}
