use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::providers::request::{ProviderRequest, ProviderRequestError};
use crate::providers::streaming_response::{ProviderStreamResponse, TokenUsage};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

// ============================================================================
// REQUEST
// ============================================================================

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Part {
    pub text: Option<String>,
    /// Set on parts carrying the model's thoughts when `includeThoughts` is on.
    pub thought: Option<bool>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }

    pub fn is_thought(&self) -> bool {
        self.thought == Some(true)
    }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThinkingConfig {
    #[serde(rename = "includeThoughts")]
    pub include_thoughts: bool,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GenerationConfig {
    #[serde(rename = "thinkingConfig")]
    pub thinking_config: Option<ThinkingConfig>,
}

/// Body of `models/{model}:streamGenerateContent`.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerateContentRequest {
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: Option<GenerationConfig>,
    /// The model travels in the URL path, never in the body.
    #[serde(skip)]
    pub model: String,
}

impl GenerateContentRequest {
    /// Single-turn request asking the model to summarize `text`.
    pub fn summarize(
        model: impl Into<String>,
        text: impl Into<String>,
        instruction: Option<&str>,
        enable_thinking: bool,
    ) -> Self {
        Self {
            system_instruction: instruction
                .filter(|i| !i.is_empty())
                .map(|i| Content {
                    role: None,
                    parts: vec![Part::text(i)],
                }),
            contents: vec![Content {
                role: None,
                parts: vec![Part::text(text)],
            }],
            generation_config: Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    include_thoughts: enable_thinking,
                }),
            }),
            model: model.into(),
        }
    }
}

impl ProviderRequest for GenerateContentRequest {
    fn model(&self) -> &str {
        &self.model
    }

    fn set_model(&mut self, model: String) {
        self.model = model;
    }

    fn is_streaming(&self) -> bool {
        // streaming is selected by the endpoint, not a body field
        true
    }

    fn to_bytes(&self) -> Result<Vec<u8>, ProviderRequestError> {
        serde_json::to_vec(self).map_err(ProviderRequestError::Serialization)
    }
}

// ============================================================================
// STREAMING RESPONSE
// ============================================================================

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
    pub index: Option<u32>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
    pub thoughts_token_count: Option<u32>,
}

impl TokenUsage for UsageMetadata {
    fn completion_tokens(&self) -> usize {
        self.candidates_token_count.unwrap_or(0) as usize
    }

    fn prompt_tokens(&self) -> usize {
        self.prompt_token_count.unwrap_or(0) as usize
    }

    fn total_tokens(&self) -> usize {
        self.total_token_count.unwrap_or(0) as usize
    }

    fn reasoning_tokens(&self) -> Option<usize> {
        self.thoughts_token_count.map(|n| n as usize)
    }
}

/// One `data:` payload of a Gemini SSE stream.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentStreamResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    /// e.g. "gemini-2.5-flash"
    pub model_version: Option<String>,
    pub response_id: Option<String>,
}

impl GenerateContentStreamResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    fn first_part(&self) -> Option<&Part> {
        self.first_candidate()?.content.as_ref()?.parts.first()
    }
}

impl ProviderStreamResponse for GenerateContentStreamResponse {
    fn content_delta(&self) -> Option<&str> {
        self.first_part()
            .filter(|part| !part.is_thought())
            .and_then(|part| part.text.as_deref())
    }

    fn reasoning_delta(&self) -> Option<&str> {
        self.first_part()
            .filter(|part| part.is_thought())
            .and_then(|part| part.text.as_deref())
    }

    fn is_final(&self) -> bool {
        self.first_candidate()
            .is_some_and(|c| c.finish_reason.is_some())
    }

    fn role(&self) -> Option<&str> {
        self.first_candidate()?.content.as_ref()?.role.as_deref()
    }

    fn usage(&self) -> Option<&dyn TokenUsage> {
        self.usage_metadata
            .as_ref()
            .map(|usage| usage as &dyn TokenUsage)
    }

    fn model_version(&self) -> Option<&str> {
        self.model_version.as_deref()
    }

    fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_summarize_request_wire_shape() {
        let request = GenerateContentRequest::summarize(
            "gemini-2.5-flash",
            "thread body",
            Some("summarize this"),
            true,
        );
        let body: serde_json::Value = serde_json::from_slice(&request.to_bytes().unwrap()).unwrap();

        assert_eq!(
            body,
            json!({
                "system_instruction": {"parts": [{"text": "summarize this"}]},
                "contents": [{"parts": [{"text": "thread body"}]}],
                "generationConfig": {"thinkingConfig": {"includeThoughts": true}}
            })
        );
        assert_eq!(request.model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_summarize_request_without_instruction() {
        let request = GenerateContentRequest::summarize("m", "t", None, false);
        let body: serde_json::Value = serde_json::from_slice(&request.to_bytes().unwrap()).unwrap();
        assert!(body.get("system_instruction").is_none());
        assert_eq!(
            body["generationConfig"]["thinkingConfig"]["includeThoughts"],
            json!(false)
        );
    }

    #[test]
    fn test_stream_chunk_text_and_metadata() {
        let chunk: GenerateContentStreamResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello"}]}, "index": 0}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 2, "totalTokenCount": 12, "thoughtsTokenCount": 4},
            "modelVersion": "gemini-2.5-flash",
            "responseId": "abc"
        }))
        .unwrap();

        assert_eq!(chunk.content_delta(), Some("Hello"));
        assert_eq!(chunk.reasoning_delta(), None);
        assert_eq!(chunk.role(), Some("model"));
        assert!(!chunk.is_final());
        let usage = chunk.usage().unwrap();
        assert_eq!(usage.prompt_tokens(), 10);
        assert_eq!(usage.completion_tokens(), 2);
        assert_eq!(usage.total_tokens(), 12);
        assert_eq!(usage.reasoning_tokens(), Some(4));
        assert_eq!(chunk.model_version(), Some("gemini-2.5-flash"));
        assert_eq!(chunk.response_id(), Some("abc"));
    }

    #[test]
    fn test_thought_part_is_reasoning() {
        let chunk: GenerateContentStreamResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "considering...", "thought": true}]}}]
        }))
        .unwrap();
        assert_eq!(chunk.content_delta(), None);
        assert_eq!(chunk.reasoning_delta(), Some("considering..."));
    }

    #[test]
    fn test_empty_candidates_has_no_delta() {
        let chunk: GenerateContentStreamResponse =
            serde_json::from_value(json!({"candidates": []})).unwrap();
        assert_eq!(chunk.content_delta(), None);
        assert_eq!(chunk.reasoning_delta(), None);

        let chunk: GenerateContentStreamResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(chunk.content_delta(), None);
    }

    #[test]
    fn test_finish_reason_marks_final() {
        let chunk: GenerateContentStreamResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "."}]}, "finishReason": "STOP"}]
        }))
        .unwrap();
        assert!(chunk.is_final());
    }
}
