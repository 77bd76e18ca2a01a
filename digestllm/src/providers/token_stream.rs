use bytes::Bytes;
use futures_core::Stream;
use log::debug;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use thiserror::Error;

use crate::apis::streaming_shapes::reasoning::{ChannelDelta, ReasoningMarkers, ReasoningSplitter};
use crate::clients::endpoints::StreamingProtocol;
use crate::providers::decoder::StreamDecoder;
use crate::providers::streaming_response::{DeltaToken, FrameDiagnostic, StreamUsage};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("upstream returned status {status}: {message}")]
    Transport { status: u16, message: String },
    #[error("upstream response has no body")]
    MissingBody,
    #[error("failed to read upstream body: {0}")]
    Body(String),
}

impl StreamError {
    pub fn transport(status: u16, message: impl Into<String>) -> Self {
        StreamError::Transport {
            status,
            message: message.into(),
        }
    }
}

/// Lazy, single-pass sequence of [`DeltaToken`]s read from a response body.
///
/// `Ignorable` tokens are counted and never yielded. `End` is yielded exactly
/// once, after which the stream returns `None`. The body is released as soon
/// as the protocol's end sentinel is decoded.
pub struct TokenStream<S> {
    body: Option<S>,
    decoder: StreamDecoder,
    pending: VecDeque<DeltaToken>,
    ignored: usize,
    finished: bool,
}

impl<S, E> TokenStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    /// Validate the response envelope and start decoding its body.
    pub fn open(
        protocol: StreamingProtocol,
        status: u16,
        body: Option<S>,
    ) -> Result<Self, StreamError> {
        if !(200..300).contains(&status) {
            return Err(StreamError::transport(
                status,
                format!("non-success status for {}", protocol),
            ));
        }
        let body = body.ok_or(StreamError::MissingBody)?;

        Ok(Self {
            body: Some(body),
            decoder: StreamDecoder::new(protocol),
            pending: VecDeque::new(),
            ignored: 0,
            finished: false,
        })
    }

    /// Split text tokens into visible and reasoning channels using `markers`.
    pub fn into_channels(self, markers: ReasoningMarkers) -> ChannelStream<S> {
        ChannelStream {
            tokens: self,
            splitter: ReasoningSplitter::new(markers),
            pending: VecDeque::new(),
            deferred_error: None,
            done: false,
        }
    }
}

impl<S> TokenStream<S> {
    pub fn protocol(&self) -> StreamingProtocol {
        self.decoder.protocol()
    }

    pub fn diagnostics(&self) -> &[FrameDiagnostic] {
        self.decoder.diagnostics()
    }

    pub fn usage(&self) -> Option<StreamUsage> {
        self.decoder.usage()
    }

    pub fn model_version(&self) -> Option<&str> {
        self.decoder.model_version()
    }

    /// Frames that carried nothing to show, including unparseable ones.
    pub fn ignored_frames(&self) -> usize {
        self.ignored
    }

    /// Whether the body is still held.
    pub fn is_body_open(&self) -> bool {
        self.body.is_some()
    }

    fn enqueue(&mut self, tokens: Vec<DeltaToken>) {
        for token in tokens {
            match token {
                DeltaToken::Ignorable => self.ignored += 1,
                token => self.pending.push_back(token),
            }
        }
    }
}

impl<S, E> Stream for TokenStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<DeltaToken, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(token) = this.pending.pop_front() {
                if token.is_end() {
                    this.finished = true;
                    this.pending.clear();
                    this.body = None;
                }
                return Poll::Ready(Some(Ok(token)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            let Some(body) = this.body.as_mut() else {
                let tokens = this.decoder.flush();
                if tokens.is_empty() {
                    this.finished = true;
                }
                this.enqueue(tokens);
                continue;
            };

            match ready!(Pin::new(body).poll_next(cx)) {
                Some(Ok(chunk)) => {
                    let tokens = this.decoder.consume(&chunk);
                    this.enqueue(tokens);
                    if this.decoder.is_finished() {
                        debug!("end sentinel decoded, releasing upstream body");
                        this.body = None;
                    }
                }
                Some(Err(err)) => {
                    this.body = None;
                    this.finished = true;
                    this.pending.clear();
                    return Poll::Ready(Some(Err(StreamError::Body(err.to_string()))));
                }
                None => {
                    this.body = None;
                    let tokens = this.decoder.flush();
                    this.enqueue(tokens);
                }
            }
        }
    }
}

/// [`TokenStream`] demultiplexed into visible and reasoning text.
///
/// Inline reasoning markers in text tokens are handled by a
/// [`ReasoningSplitter`]; structured reasoning tokens go straight to the
/// reasoning channel.
pub struct ChannelStream<S> {
    tokens: TokenStream<S>,
    splitter: ReasoningSplitter,
    pending: VecDeque<ChannelDelta>,
    deferred_error: Option<StreamError>,
    done: bool,
}

impl<S> ChannelStream<S> {
    pub fn tokens(&self) -> &TokenStream<S> {
        &self.tokens
    }
}

impl<S, E> Stream for ChannelStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<ChannelDelta, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(delta) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(delta)));
            }
            if let Some(err) = this.deferred_error.take() {
                return Poll::Ready(Some(Err(err)));
            }
            if this.done {
                return Poll::Ready(None);
            }

            match ready!(Pin::new(&mut this.tokens).poll_next(cx)) {
                Some(Ok(DeltaToken::Text(text))) => this.pending.extend(this.splitter.push(&text)),
                Some(Ok(DeltaToken::Reasoning(text))) => {
                    this.pending.push_back(ChannelDelta::Reasoning(text))
                }
                Some(Ok(DeltaToken::Ignorable)) => {}
                Some(Ok(DeltaToken::End)) | None => {
                    this.pending.extend(this.splitter.flush());
                    this.done = true;
                }
                Some(Err(err)) => {
                    // text already routed is still delivered ahead of the error
                    this.pending.extend(this.splitter.flush());
                    this.deferred_error = Some(err);
                    this.done = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    type Chunk = Result<Bytes, io::Error>;

    fn chunks(parts: &[&str]) -> Vec<Chunk> {
        parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect()
    }

    fn openai_line(content: &str) -> String {
        format!(
            "data: {}\n",
            json!({"choices": [{"index": 0, "delta": {"content": content}}]})
        )
    }

    /// Body that records when it is dropped.
    struct TrackedBody<S> {
        inner: S,
        dropped: Arc<AtomicBool>,
    }

    impl<S: Stream + Unpin> Stream for TrackedBody<S> {
        type Item = S::Item;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Pin::new(&mut self.inner).poll_next(cx)
        }
    }

    impl<S> Drop for TrackedBody<S> {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_open_rejects_non_success_status() {
        let body = stream::iter(chunks(&["data: {}\n"]));
        let err = TokenStream::open(StreamingProtocol::OpenAICompatible, 401, Some(body))
            .err()
            .unwrap();
        assert!(matches!(err, StreamError::Transport { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_open_rejects_missing_body() {
        let err = TokenStream::open(
            StreamingProtocol::Gemini,
            200,
            None::<stream::Iter<std::vec::IntoIter<Chunk>>>,
        )
        .err()
        .unwrap();
        assert!(matches!(err, StreamError::MissingBody));
    }

    #[tokio::test]
    async fn test_tokens_end_once_and_ignorables_absorbed() {
        let first = openai_line("Hel");
        let body = stream::iter(chunks(&[
            &first[..10],
            &first[10..],
            ": comment\n",
            "data: {\"choices\":[]}\n",
            openai_line("lo").as_str(),
            "data: [DONE]\n",
        ]));
        let mut tokens =
            TokenStream::open(StreamingProtocol::OpenAICompatible, 200, Some(body)).unwrap();

        let mut seen = Vec::new();
        while let Some(item) = tokens.next().await {
            seen.push(item.unwrap());
        }
        assert_eq!(
            seen,
            vec![
                DeltaToken::Text("Hel".to_string()),
                DeltaToken::Text("lo".to_string()),
                DeltaToken::End
            ]
        );
        assert_eq!(tokens.ignored_frames(), 1);
        assert!(tokens.next().await.is_none());
    }

    #[tokio::test]
    async fn test_body_released_on_sentinel() {
        let dropped = Arc::new(AtomicBool::new(false));
        let inner = stream::iter(vec![
            Ok(Bytes::from(format!("{}data: [DONE]\n", openai_line("x")))),
            Err(io::Error::new(io::ErrorKind::Other, "must never be read")),
        ]);
        let body = TrackedBody {
            inner,
            dropped: dropped.clone(),
        };
        let mut tokens =
            TokenStream::open(StreamingProtocol::OpenAICompatible, 200, Some(body)).unwrap();

        assert_eq!(
            tokens.next().await.unwrap().unwrap(),
            DeltaToken::Text("x".to_string())
        );
        assert!(dropped.load(Ordering::SeqCst));
        assert!(!tokens.is_body_open());
        assert_eq!(tokens.next().await.unwrap().unwrap(), DeltaToken::End);
        assert!(tokens.next().await.is_none());
    }

    #[tokio::test]
    async fn test_body_error_finishes_stream() {
        let body = stream::iter(vec![
            Ok(Bytes::from(openai_line("partial"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")),
            Ok(Bytes::from(openai_line("unreachable"))),
        ]);
        let mut tokens =
            TokenStream::open(StreamingProtocol::OpenAICompatible, 200, Some(body)).unwrap();

        assert_eq!(
            tokens.next().await.unwrap().unwrap(),
            DeltaToken::Text("partial".to_string())
        );
        match tokens.next().await {
            Some(Err(StreamError::Body(message))) => assert_eq!(message, "reset by peer"),
            other => panic!("expected body error, got {:?}", other),
        }
        assert!(tokens.next().await.is_none());
    }

    #[tokio::test]
    async fn test_gemini_stream_ends_when_body_closes() {
        let frame = format!(
            "data: {}\r\n\r\n",
            json!({"candidates": [{"content": {"parts": [{"text": "总结"}]}}]})
        );
        let bytes = frame.as_bytes();
        // split inside the multi-byte text
        let split = frame.find("总").unwrap() + 1;
        let body = stream::iter(vec![
            Ok::<_, io::Error>(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ]);
        let tokens = TokenStream::open(StreamingProtocol::Gemini, 200, Some(body)).unwrap();

        let seen: Vec<DeltaToken> = tokens.map(|t| t.unwrap()).collect().await;
        assert_eq!(
            seen,
            vec![DeltaToken::Text("总结".to_string()), DeltaToken::End]
        );
    }

    #[tokio::test]
    async fn test_channels_split_inline_and_structured_reasoning() {
        let structured = format!(
            "data: {}\n",
            json!({"choices": [{"delta": {"reasoning_content": "plan. "}}]})
        );
        let body = stream::iter(chunks(&[
            structured.as_str(),
            openai_line("<thi").as_str(),
            openai_line("nk>inline</th").as_str(),
            openai_line("ink>Answer").as_str(),
            "data: [DONE]\n",
        ]));
        let channels = TokenStream::open(StreamingProtocol::OpenAICompatible, 200, Some(body))
            .unwrap()
            .into_channels(ReasoningMarkers::default());

        let deltas: Vec<ChannelDelta> = channels.map(|d| d.unwrap()).collect().await;
        assert_eq!(
            deltas,
            vec![
                ChannelDelta::Reasoning("plan. ".to_string()),
                ChannelDelta::Reasoning("inline".to_string()),
                ChannelDelta::Visible("Answer".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_channels_flush_held_text_before_error() {
        let body = stream::iter(vec![
            Ok(Bytes::from(openai_line("done <"))),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")),
        ]);
        let mut channels =
            TokenStream::open(StreamingProtocol::OpenAICompatible, 200, Some(body))
                .unwrap()
                .into_channels(ReasoningMarkers::default());

        assert_eq!(
            channels.next().await.unwrap().unwrap(),
            ChannelDelta::Visible("done ".to_string())
        );
        assert_eq!(
            channels.next().await.unwrap().unwrap(),
            ChannelDelta::Visible("<".to_string())
        );
        assert!(matches!(
            channels.next().await,
            Some(Err(StreamError::Body(_)))
        ));
        assert!(channels.next().await.is_none());
    }
}
