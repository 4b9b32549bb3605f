//! Peer Call
//!
//! Replays one broadcast against one peer and reports what happened on the
//! shared multiplexer.
//!
//! ## Lifecycle
//! `Sent -> HeadersReceived -> {Streaming | Errored} -> Terminal`
//!
//! Every path through [`PeerCall::run`] ends in the same place: the state is
//! marked terminal and the completion tracker is decremented once. Outcome
//! handling only decides what gets written to the sink on the way there.

use super::multiplexer::ResponseMultiplexer;
use super::ndjson::ndjson_records;
use super::protocol::{ErrorLine, FIELD_CLUSTER_ID, HEADER_CLUSTER_ID, HEADER_REQUEST_ID};
use super::tracker::CompletionTracker;
use super::types::*;

use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;

pub struct PeerCall {
    state: PeerCallState,
    request: Arc<BroadcastRequest>,
    client: reqwest::Client,
    tracker: Arc<CompletionTracker>,
    sink: Arc<ResponseMultiplexer>,
}

impl PeerCall {
    pub fn new(
        target: PeerTarget,
        request: Arc<BroadcastRequest>,
        client: reqwest::Client,
        tracker: Arc<CompletionTracker>,
        sink: Arc<ResponseMultiplexer>,
    ) -> Self {
        Self {
            state: PeerCallState::new(target),
            request,
            client,
            tracker,
            sink,
        }
    }

    /// Drives the call to a terminal outcome and decrements the tracker once.
    pub async fn run(mut self) -> CallOutcome {
        let outcome = self.execute().await;

        if !self.state.terminal {
            self.state.terminal = true;
            self.tracker.mark_one_done();
        }

        tracing::debug!(
            "Broadcast to {} finished: {:?} (status {}, transport failed: {}, {} of {} calls pending)",
            self.state.target.base_uri,
            outcome,
            self.state.status,
            self.state.transport_failed,
            self.tracker.remaining(),
            self.tracker.total()
        );

        outcome
    }

    async fn execute(&mut self) -> CallOutcome {
        let url = self.state.target.start_task_url(&self.request.bucket);

        let response = match self.build_request(&url).send().await {
            Ok(response) => response,
            Err(e) => return self.fail(&url, e),
        };

        self.state.status = response.status().as_u16();
        self.state.cluster_id = response
            .headers()
            .get(HEADER_CLUSTER_ID)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| ClusterId(value.to_string()));

        let outcome = CallOutcome::classify(self.state.status, self.state.cluster_id.as_ref());

        match outcome {
            CallOutcome::Success => self.stream_records(&url, response).await,
            CallOutcome::EmptySuccess => match drain(response).await {
                Ok(()) => outcome,
                Err(e) => self.fail(&url, e),
            },
            _ => {
                self.report(&url, outcome);
                // The error line is already out; a failure here only ends the drain.
                if let Err(e) = drain(response).await {
                    self.state.transport_failed = true;
                    tracing::debug!("Error draining response from {}: {}", url, e);
                }
                outcome
            }
        }
    }

    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(url)
            .header(HEADER_REQUEST_ID, self.request.request_id.0.as_str())
            .json(&self.request.body);

        if !self.request.query.is_empty() {
            builder = builder.query(&self.request.query);
        }

        if let Some(credentials) = &self.request.credentials {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }

        builder
    }

    async fn stream_records(&mut self, url: &str, response: reqwest::Response) -> CallOutcome {
        let Some(cluster_id) = self.state.cluster_id.clone() else {
            return CallOutcome::MissingIdentity;
        };

        let records = ndjson_records(response.bytes_stream());
        futures::pin_mut!(records);

        while let Some(item) = records.next().await {
            match item {
                Ok(record) => {
                    if !self.sink.write(&tag_record(record, &cluster_id)) && self.sink.is_detached() {
                        tracing::debug!("Caller went away, abandoning broadcast to {}", url);
                        break;
                    }
                }
                Err(e) => return self.fail(url, e),
            }
        }

        CallOutcome::Success
    }

    fn fail(&mut self, url: &str, error: reqwest::Error) -> CallOutcome {
        self.state.transport_failed = true;
        tracing::error!(
            "Could not broadcast to {} (status {}): {}",
            url,
            self.state.status,
            error
        );
        self.report(url, CallOutcome::Unreachable);
        CallOutcome::Unreachable
    }

    fn report(&self, url: &str, outcome: CallOutcome) {
        match outcome {
            CallOutcome::MissingIdentity => {
                tracing::error!("Unsuccessful broadcast (no X-Postable-Cluster-ID header) to {}", url);
            }
            CallOutcome::UnsuccessfulStatus(status) => {
                tracing::error!("Unsuccessful broadcast (HTTP {}) to {}", status, url);
            }
            _ => {}
        }

        let line = ErrorLine::new(
            self.state.cluster_id.clone(),
            outcome.reported_status(self.state.status),
            outcome.description(),
        );
        self.sink.write(&line);
    }
}

/// Injects the peer identity into an object record. Other JSON values pass through.
pub fn tag_record(record: Value, cluster_id: &ClusterId) -> Value {
    match record {
        Value::Object(mut fields) => {
            fields.insert(
                FIELD_CLUSTER_ID.to_string(),
                Value::String(cluster_id.0.clone()),
            );
            Value::Object(fields)
        }
        other => other,
    }
}

async fn drain(mut response: reqwest::Response) -> Result<(), reqwest::Error> {
    while response.chunk().await?.is_some() {}
    Ok(())
}
