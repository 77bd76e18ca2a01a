use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::providers::request::{ProviderRequest, ProviderRequestError};
use crate::providers::streaming_response::{ProviderStreamResponse, TokenUsage};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

// ============================================================================
// REQUEST
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatCompletionsRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: Option<bool>,
    pub temperature: Option<f32>,
}

impl ChatCompletionsRequest {
    /// Streaming request asking the model to summarize `text`.
    pub fn summarize(
        model: impl Into<String>,
        text: impl Into<String>,
        instruction: Option<&str>,
    ) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(instruction) = instruction.filter(|i| !i.is_empty()) {
            messages.push(Message {
                role: Role::System,
                content: instruction.to_string(),
            });
        }
        messages.push(Message {
            role: Role::User,
            content: text.into(),
        });

        Self {
            model: model.into(),
            messages,
            stream: Some(true),
            temperature: None,
        }
    }
}

impl ProviderRequest for ChatCompletionsRequest {
    fn model(&self) -> &str {
        &self.model
    }

    fn set_model(&mut self, model: String) {
        self.model = model;
    }

    fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
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
pub struct MessageDelta {
    pub role: Option<String>,
    pub content: Option<String>,
    /// Structured reasoning channel used by DeepSeek-style providers.
    pub reasoning_content: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StreamChoice {
    pub index: Option<u32>,
    #[serde(default)]
    pub delta: MessageDelta,
    pub finish_reason: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CompletionTokensDetails {
    pub reasoning_tokens: Option<u32>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

impl TokenUsage for Usage {
    fn completion_tokens(&self) -> usize {
        self.completion_tokens as usize
    }

    fn prompt_tokens(&self) -> usize {
        self.prompt_tokens as usize
    }

    fn total_tokens(&self) -> usize {
        self.total_tokens as usize
    }

    fn reasoning_tokens(&self) -> Option<usize> {
        self.completion_tokens_details
            .as_ref()?
            .reasoning_tokens
            .map(|n| n as usize)
    }
}

/// One `data:` payload of a `chat.completion.chunk` stream.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChatCompletionsStreamResponse {
    pub id: Option<String>,
    pub object: Option<String>,
    pub created: Option<u64>,
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    pub usage: Option<Usage>,
}

impl ChatCompletionsStreamResponse {
    fn first_choice(&self) -> Option<&StreamChoice> {
        self.choices.first()
    }
}

impl ProviderStreamResponse for ChatCompletionsStreamResponse {
    fn content_delta(&self) -> Option<&str> {
        self.first_choice()?.delta.content.as_deref()
    }

    fn reasoning_delta(&self) -> Option<&str> {
        self.first_choice()?.delta.reasoning_content.as_deref()
    }

    fn is_final(&self) -> bool {
        self.first_choice()
            .is_some_and(|choice| choice.finish_reason.is_some())
    }

    fn role(&self) -> Option<&str> {
        self.first_choice()?.delta.role.as_deref()
    }

    fn usage(&self) -> Option<&dyn TokenUsage> {
        self.usage.as_ref().map(|usage| usage as &dyn TokenUsage)
    }

    fn model_version(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn response_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}
