//! Upstream streaming endpoints
//!
//! Each supported vendor is reached through one streaming endpoint. This
//! module maps a provider and model to that URL and to the framing
//! convention the response body uses.
//!
//! # Examples
//!
//! ```rust
//! use digestllm::clients::endpoints::streaming_endpoint;
//! use digestllm::ProviderId;
//!
//! let url = streaming_endpoint(ProviderId::OpenAI, None, "gpt-4o-mini");
//! assert_eq!(url, "https://api.openai.com/v1/chat/completions");
//!
//! let url = streaming_endpoint(ProviderId::Gemini, Some("http://localhost:8080/"), "gemini-2.5-flash");
//! assert_eq!(
//!     url,
//!     "http://localhost:8080/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
//! );
//! ```

use crate::apis::streaming_shapes::sse::FrameConvention;
use crate::ProviderId;
use std::fmt;

pub const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Wire protocol of a streaming response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamingProtocol {
    /// `streamGenerateContent?alt=sse`
    Gemini,
    /// `/chat/completions` with `stream: true`
    OpenAICompatible,
}

impl StreamingProtocol {
    pub fn frame_convention(&self) -> FrameConvention {
        match self {
            StreamingProtocol::Gemini => FrameConvention::GEMINI,
            StreamingProtocol::OpenAICompatible => FrameConvention::OPENAI,
        }
    }
}

impl fmt::Display for StreamingProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamingProtocol::Gemini => write!(f, "Gemini streamGenerateContent"),
            StreamingProtocol::OpenAICompatible => write!(f, "OpenAI chat completions"),
        }
    }
}

pub fn default_base_url(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::Gemini => GEMINI_DEFAULT_BASE_URL,
        ProviderId::OpenAI | ProviderId::Anthropic => OPENAI_DEFAULT_BASE_URL,
    }
}

/// Full URL of the streaming endpoint for `model`. `base_url` falls back to
/// the provider default and may carry a trailing `/`.
pub fn streaming_endpoint(provider: ProviderId, base_url: Option<&str>, model: &str) -> String {
    let base = base_url
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| default_base_url(provider))
        .trim_end_matches('/');

    match provider.protocol() {
        StreamingProtocol::Gemini => format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            base, model
        ),
        StreamingProtocol::OpenAICompatible => format!("{}/chat/completions", base),
    }
}
