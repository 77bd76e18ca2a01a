use log::{debug, warn};

use crate::apis::streaming_shapes::sse::{FrameSplitter, SseFrame};
use crate::apis::streaming_shapes::utf8::Utf8StreamDecoder;
use crate::clients::endpoints::StreamingProtocol;
use crate::providers::streaming_response::{
    delta_tokens, DeltaToken, FrameDiagnostic, ProviderStreamResponse,
    ProviderStreamResponseType, StreamUsage,
};

/// Synchronous byte-to-token decoder for one response body.
///
/// Bytes go through UTF-8 decoding, then frame splitting for the protocol's
/// convention, then payload parsing. Output is independent of how the body
/// was chunked.
#[derive(Debug)]
pub struct StreamDecoder {
    protocol: StreamingProtocol,
    text: Utf8StreamDecoder,
    frames: FrameSplitter,
    diagnostics: Vec<FrameDiagnostic>,
    usage: Option<StreamUsage>,
    model_version: Option<String>,
    ended: bool,
    flushed: bool,
}

impl StreamDecoder {
    pub fn new(protocol: StreamingProtocol) -> Self {
        Self {
            protocol,
            text: Utf8StreamDecoder::new(),
            frames: FrameSplitter::new(protocol.frame_convention()),
            diagnostics: Vec::new(),
            usage: None,
            model_version: None,
            ended: false,
            flushed: false,
        }
    }

    pub fn protocol(&self) -> StreamingProtocol {
        self.protocol
    }

    /// Feed one chunk of the body.
    pub fn consume(&mut self, bytes: &[u8]) -> Vec<DeltaToken> {
        if self.ended {
            return Vec::new();
        }
        let text = self.text.decode(bytes);
        let frames = self.frames.consume(&text);
        self.tokens_for(frames)
    }

    /// Signal that the body closed. The first call drains anything held back
    /// and terminates the sequence with `End`; later calls return nothing.
    pub fn flush(&mut self) -> Vec<DeltaToken> {
        if self.flushed {
            return Vec::new();
        }
        self.flushed = true;
        if self.ended {
            return Vec::new();
        }

        let tail = self.text.finish();
        let mut frames = self.frames.consume(&tail);
        frames.extend(self.frames.flush());

        let mut tokens = self.tokens_for(frames);
        if !self.ended {
            self.ended = true;
            tokens.push(DeltaToken::End);
        }
        tokens
    }

    /// Whether `End` has been produced.
    pub fn is_finished(&self) -> bool {
        self.ended
    }

    /// Frames dropped so far because their payload did not parse.
    pub fn diagnostics(&self) -> &[FrameDiagnostic] {
        &self.diagnostics
    }

    /// Latest usage figures reported by the vendor, if any.
    pub fn usage(&self) -> Option<StreamUsage> {
        self.usage
    }

    pub fn model_version(&self) -> Option<&str> {
        self.model_version.as_deref()
    }

    fn tokens_for(&mut self, frames: Vec<SseFrame>) -> Vec<DeltaToken> {
        let mut tokens = Vec::with_capacity(frames.len());
        for frame in frames {
            match frame {
                SseFrame::Data(payload) => tokens.extend(self.parse_payload(&payload)),
                SseFrame::Done => {
                    debug!("{} stream reached its end sentinel", self.protocol);
                    self.ended = true;
                    tokens.push(DeltaToken::End);
                    break;
                }
            }
        }
        tokens
    }

    fn parse_payload(&mut self, payload: &str) -> Vec<DeltaToken> {
        match ProviderStreamResponseType::try_from((payload.as_bytes(), &self.protocol)) {
            Ok(response) => {
                if let Some(usage) = response.usage() {
                    self.usage = Some(StreamUsage::from(usage));
                }
                if let Some(model) = response.model_version() {
                    if self.model_version.as_deref() != Some(model) {
                        self.model_version = Some(model.to_string());
                    }
                }
                delta_tokens(&response)
            }
            Err(err) => {
                let diagnostic = FrameDiagnostic::new(payload, &err);
                warn!(
                    "dropping unparseable {} frame: {} (payload: {})",
                    self.protocol, diagnostic.reason, diagnostic.payload_excerpt
                );
                self.diagnostics.push(diagnostic);
                vec![DeltaToken::Ignorable]
            }
        }
    }
}
