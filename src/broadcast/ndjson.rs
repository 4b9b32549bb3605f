//! Incremental NDJSON decoding of a peer response body.
//!
//! Turns a stream of byte chunks into a lazy stream of JSON records, one per
//! line. Chunk boundaries may fall anywhere, including inside a record. Blank
//! and unparseable lines are skipped; a final record without a trailing
//! newline is still yielded. A transport error is yielded once, after every
//! record already complete in the buffer, and ends the stream.

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;

type ByteStream<E> = Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>;

struct DecoderState<E> {
    inner: ByteStream<E>,
    buffer: BytesMut,
    // Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    pending_error: Option<E>,
    finished: bool,
}

/// Decodes `byte_stream` into JSON records.
pub fn ndjson_records<S, E>(byte_stream: S) -> impl Stream<Item = Result<Value, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    let state = DecoderState {
        inner: Box::pin(byte_stream) as ByteStream<E>,
        buffer: BytesMut::with_capacity(8192),
        scanned: 0,
        pending_error: None,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            let newline = state.buffer[state.scanned..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|offset| state.scanned + offset);

            if let Some(pos) = newline {
                let line = state.buffer.split_to(pos + 1);
                state.scanned = 0;
                if let Some(record) = parse_line(&line[..pos]) {
                    return Some((Ok(record), state));
                }
                continue;
            }
            state.scanned = state.buffer.len();

            if state.finished {
                if let Some(e) = state.pending_error.take() {
                    return Some((Err(e), state));
                }
                if state.buffer.has_remaining() {
                    let rest = state.buffer.split();
                    state.scanned = 0;
                    if let Some(record) = parse_line(&rest) {
                        return Some((Ok(record), state));
                    }
                }
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    // Whatever is left is a truncated record.
                    state.buffer.clear();
                    state.scanned = 0;
                    state.pending_error = Some(e);
                    state.finished = true;
                }
                None => state.finished = true,
            }
        }
    })
}

fn parse_line(raw: &[u8]) -> Option<Value> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text.trim(),
        Err(_) => {
            tracing::warn!("Skipping non UTF-8 line in peer response");
            return None;
        }
    };

    if text.is_empty() {
        return None;
    }

    match serde_json::from_str(text) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("Skipping malformed record in peer response: {}", e);
            None
        }
    }
}
