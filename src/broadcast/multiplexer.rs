//! Response Multiplexer
//!
//! The single writer of a broadcast's outgoing NDJSON body. Peer calls hand it
//! records from any task; each record is encoded to one complete line before
//! it touches the channel, so concurrent writers never interleave partial
//! lines. Closing drops the only sender, which ends the response body.

use bytes::Bytes;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Body stream handed to the HTTP layer.
pub type BroadcastStream = UnboundedReceiverStream<Bytes>;

pub struct ResponseMultiplexer {
    sender: Mutex<Option<UnboundedSender<Bytes>>>,
}

impl ResponseMultiplexer {
    /// Creates a multiplexer and the stream its lines are delivered on.
    pub fn channel() -> (Arc<Self>, BroadcastStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mux = Arc::new(Self {
            sender: Mutex::new(Some(tx)),
        });
        (mux, UnboundedReceiverStream::new(rx))
    }

    /// Appends one record as a newline-terminated JSON line.
    ///
    /// Returns `false` when the line was not delivered (stream closed or the
    /// caller went away).
    pub fn write<T: Serialize + ?Sized>(&self, record: &T) -> bool {
        let mut line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to encode broadcast record: {}", e);
                return false;
            }
        };
        line.push(b'\n');

        match self.sender().as_ref() {
            Some(tx) => tx.send(Bytes::from(line)).is_ok(),
            None => {
                tracing::warn!("Dropping broadcast record written after close");
                false
            }
        }
    }

    /// Ends the outgoing stream. Further calls are no-ops.
    pub fn close(&self) {
        if self.sender().take().is_some() {
            tracing::debug!("Broadcast response stream closed");
        }
    }

    /// True once the receiving side has been dropped (caller disconnected).
    pub fn is_detached(&self) -> bool {
        match self.sender().as_ref() {
            Some(tx) => tx.is_closed(),
            None => true,
        }
    }

    fn sender(&self) -> MutexGuard<'_, Option<UnboundedSender<Bytes>>> {
        match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
