use bytes::Bytes;
use digestllm::{ChannelDelta, ChannelStream, StreamError};
use futures::Stream;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use serde_json::json;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn, Instrument};

pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Turns channel deltas into response body bytes.
pub trait DeltaProcessor: Send + 'static {
    /// Bytes to send for `delta`, or `None` to skip it
    fn process_delta(&mut self, delta: ChannelDelta) -> Option<Bytes>;

    /// Called when the upstream stream fails after the response has started
    fn on_error(&mut self, _error: &StreamError) -> Option<Bytes> {
        None
    }

    fn content_type(&self) -> &'static str;
}

/// Visible text only, as it arrives.
pub struct PlainTextProcessor;

impl DeltaProcessor for PlainTextProcessor {
    fn process_delta(&mut self, delta: ChannelDelta) -> Option<Bytes> {
        match delta {
            ChannelDelta::Visible(text) => Some(Bytes::from(text)),
            ChannelDelta::Reasoning(_) => None,
        }
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }
}

/// One `{"channel":..,"text":..}` object per line for both channels.
pub struct NdjsonProcessor;

impl DeltaProcessor for NdjsonProcessor {
    fn process_delta(&mut self, delta: ChannelDelta) -> Option<Bytes> {
        let mut line = serde_json::to_vec(&delta).ok()?;
        line.push(b'\n');
        Some(Bytes::from(line))
    }

    fn on_error(&mut self, error: &StreamError) -> Option<Bytes> {
        let mut line = json!({ "error": { "message": error.to_string() } }).to_string();
        line.push('\n');
        Some(Bytes::from(line))
    }

    fn content_type(&self) -> &'static str {
        "application/x-ndjson"
    }
}

/// Result of creating a streaming response
pub struct StreamingResponse {
    pub body: BoxBody<Bytes, hyper::Error>,
    pub processor_handle: tokio::task::JoinHandle<()>,
}

/// Stream `channels` to the client through `processor`.
///
/// The forwarding task runs inside the caller's span. It stops, dropping
/// `channels` and with it the upstream body, as soon as the client goes away,
/// even while nothing is being sent.
pub fn create_streaming_response<S, E, P>(
    mut channels: ChannelStream<S>,
    mut processor: P,
    buffer_size: usize,
) -> StreamingResponse
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + 'static,
    P: DeltaProcessor,
{
    let (tx, rx) = mpsc::channel::<Bytes>(buffer_size);

    // Spawn a task to decode and forward deltas
    let processor_handle = tokio::spawn(
        async move {
            let mut delivered = 0usize;
            loop {
                let next = tokio::select! {
                    item = channels.next() => Some(item),
                    _ = tx.closed() => None,
                };
                let Some(item) = next else {
                    warn!("client disconnected");
                    break;
                };

                let bytes = match item {
                    Some(Ok(delta)) => processor.process_delta(delta),
                    Some(Err(err)) => {
                        warn!(error = %err, "upstream stream failed");
                        if let Some(bytes) = processor.on_error(&err) {
                            let _ = tx.send(bytes).await;
                        }
                        break;
                    }
                    None => break,
                };

                let Some(bytes) = bytes else {
                    continue;
                };
                delivered += bytes.len();
                if tx.send(bytes).await.is_err() {
                    warn!("client disconnected");
                    break;
                }
            }

            let tokens = channels.tokens();
            info!(
                delivered_bytes = delivered,
                model_version = tokens.model_version().unwrap_or("unknown"),
                total_tokens = tokens.usage().map(|u| u.total_tokens),
                ignored_frames = tokens.ignored_frames(),
                dropped_frames = tokens.diagnostics().len(),
                "summary stream finished"
            );
        }
        .in_current_span(),
    );

    // Convert channel receiver to HTTP stream
    let stream = ReceiverStream::new(rx).map(|chunk| Ok::<_, hyper::Error>(Frame::data(chunk)));
    let stream_body = BoxBody::new(StreamBody::new(stream));

    StreamingResponse {
        body: stream_body,
        processor_handle,
    }
}
