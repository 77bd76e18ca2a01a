use serde::Serialize;
use std::convert::TryFrom;

use crate::apis::gemini::GenerateContentStreamResponse;
use crate::apis::openai::ChatCompletionsStreamResponse;
use crate::clients::endpoints::StreamingProtocol;

// ============================================================================
// DELTA TOKENS
// ============================================================================

/// Normalized unit produced for each frame of a vendor stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaToken {
    /// Visible answer text.
    Text(String),
    /// Reasoning text the vendor delivered in a structured field.
    Reasoning(String),
    /// Logical end of stream.
    End,
    /// A frame that carried nothing to show (metadata, keep-alive, a frame
    /// that failed to parse).
    Ignorable,
}

impl DeltaToken {
    pub fn text(&self) -> Option<&str> {
        match self {
            DeltaToken::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, DeltaToken::End)
    }
}

/// Map one parsed frame to its tokens: reasoning first, then text, or a
/// single `Ignorable` when neither is present.
pub fn delta_tokens(response: &dyn ProviderStreamResponse) -> Vec<DeltaToken> {
    let mut tokens = Vec::with_capacity(1);
    if let Some(reasoning) = response.reasoning_delta().filter(|r| !r.is_empty()) {
        tokens.push(DeltaToken::Reasoning(reasoning.to_string()));
    }
    if let Some(text) = response.content_delta().filter(|t| !t.is_empty()) {
        tokens.push(DeltaToken::Text(text.to_string()));
    }
    if tokens.is_empty() {
        tokens.push(DeltaToken::Ignorable);
    }
    tokens
}

// ============================================================================
// PROVIDER STREAM RESPONSE TYPES
// ============================================================================

/// Trait for token usage information
pub trait TokenUsage {
    fn completion_tokens(&self) -> usize;
    fn prompt_tokens(&self) -> usize;
    fn total_tokens(&self) -> usize;

    fn reasoning_tokens(&self) -> Option<usize> {
        None
    }
}

/// Owned copy of the latest usage figures reported on a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
    pub reasoning_tokens: Option<usize>,
}

impl From<&dyn TokenUsage> for StreamUsage {
    fn from(usage: &dyn TokenUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens(),
            completion_tokens: usage.completion_tokens(),
            total_tokens: usage.total_tokens(),
            reasoning_tokens: usage.reasoning_tokens(),
        }
    }
}

pub trait ProviderStreamResponse: Send + Sync {
    /// Get the content delta for this chunk
    fn content_delta(&self) -> Option<&str>;

    /// Get the structured reasoning delta for this chunk, if the vendor
    /// separates it from content
    fn reasoning_delta(&self) -> Option<&str>;

    /// Check if this is the final chunk in the stream
    fn is_final(&self) -> bool;

    /// Get role information if available
    fn role(&self) -> Option<&str>;

    /// Usage figures carried by this chunk, if any
    fn usage(&self) -> Option<&dyn TokenUsage>;

    fn model_version(&self) -> Option<&str> {
        None
    }

    fn response_id(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderStreamResponseType {
    GenerateContentStreamResponse(GenerateContentStreamResponse),
    ChatCompletionsStreamResponse(ChatCompletionsStreamResponse),
}

impl ProviderStreamResponseType {
    fn inner(&self) -> &dyn ProviderStreamResponse {
        match self {
            ProviderStreamResponseType::GenerateContentStreamResponse(resp) => resp,
            ProviderStreamResponseType::ChatCompletionsStreamResponse(resp) => resp,
        }
    }
}

impl ProviderStreamResponse for ProviderStreamResponseType {
    fn content_delta(&self) -> Option<&str> {
        self.inner().content_delta()
    }

    fn reasoning_delta(&self) -> Option<&str> {
        self.inner().reasoning_delta()
    }

    fn is_final(&self) -> bool {
        self.inner().is_final()
    }

    fn role(&self) -> Option<&str> {
        self.inner().role()
    }

    fn usage(&self) -> Option<&dyn TokenUsage> {
        self.inner().usage()
    }

    fn model_version(&self) -> Option<&str> {
        self.inner().model_version()
    }

    fn response_id(&self) -> Option<&str> {
        self.inner().response_id()
    }
}

// Payload parsing for the upstream protocol
impl TryFrom<(&[u8], &StreamingProtocol)> for ProviderStreamResponseType {
    type Error = serde_json::Error;

    fn try_from((bytes, protocol): (&[u8], &StreamingProtocol)) -> Result<Self, Self::Error> {
        match protocol {
            StreamingProtocol::Gemini => Ok(
                ProviderStreamResponseType::GenerateContentStreamResponse(serde_json::from_slice(
                    bytes,
                )?),
            ),
            StreamingProtocol::OpenAICompatible => Ok(
                ProviderStreamResponseType::ChatCompletionsStreamResponse(serde_json::from_slice(
                    bytes,
                )?),
            ),
        }
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

const DIAGNOSTIC_EXCERPT_CHARS: usize = 120;

/// Record of a frame that was dropped because its payload did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameDiagnostic {
    pub payload_excerpt: String,
    pub reason: String,
}

impl FrameDiagnostic {
    pub fn new(payload: &str, reason: impl ToString) -> Self {
        let payload_excerpt = match payload.char_indices().nth(DIAGNOSTIC_EXCERPT_CHARS) {
            Some((cut, _)) => format!("{}...", &payload[..cut]),
            None => payload.to_string(),
        };
        Self {
            payload_excerpt,
            reason: reason.to_string(),
        }
    }
}
