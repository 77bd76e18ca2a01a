use crate::apis::gemini::GenerateContentRequest;
use crate::apis::openai::ChatCompletionsRequest;
use crate::providers::id::ProviderId;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum ProviderRequestType {
    GenerateContentRequest(GenerateContentRequest),
    ChatCompletionsRequest(ChatCompletionsRequest),
}

pub trait ProviderRequest: Send + Sync {
    /// Extract the model name from the request
    fn model(&self) -> &str;

    /// Set the model name for the request
    fn set_model(&mut self, model: String);

    /// Check if this is a streaming request
    fn is_streaming(&self) -> bool;

    /// Convert the request to bytes for transmission
    fn to_bytes(&self) -> Result<Vec<u8>, ProviderRequestError>;
}

impl ProviderRequestType {
    /// Build the streaming summarize request in the wire shape `provider` expects.
    pub fn summarize(
        provider: ProviderId,
        model: &str,
        text: &str,
        instruction: Option<&str>,
        enable_thinking: bool,
    ) -> Self {
        match provider {
            ProviderId::Gemini => Self::GenerateContentRequest(GenerateContentRequest::summarize(
                model,
                text,
                instruction,
                enable_thinking,
            )),
            ProviderId::OpenAI | ProviderId::Anthropic => Self::ChatCompletionsRequest(
                ChatCompletionsRequest::summarize(model, text, instruction),
            ),
        }
    }

    /// Same as [`ProviderRequestType::summarize`], resolving the provider from
    /// the model name.
    pub fn summarize_for_model(
        model: &str,
        text: &str,
        instruction: Option<&str>,
        enable_thinking: bool,
    ) -> Result<Self, ProviderRequestError> {
        let provider = ProviderId::from_model(model)
            .ok_or_else(|| ProviderRequestError::UnsupportedModel(model.to_string()))?;
        Ok(Self::summarize(
            provider,
            model,
            text,
            instruction,
            enable_thinking,
        ))
    }
}

impl ProviderRequest for ProviderRequestType {
    fn model(&self) -> &str {
        match self {
            Self::GenerateContentRequest(r) => r.model(),
            Self::ChatCompletionsRequest(r) => r.model(),
        }
    }

    fn set_model(&mut self, model: String) {
        match self {
            Self::GenerateContentRequest(r) => r.set_model(model),
            Self::ChatCompletionsRequest(r) => r.set_model(model),
        }
    }

    fn is_streaming(&self) -> bool {
        match self {
            Self::GenerateContentRequest(r) => r.is_streaming(),
            Self::ChatCompletionsRequest(r) => r.is_streaming(),
        }
    }

    fn to_bytes(&self) -> Result<Vec<u8>, ProviderRequestError> {
        match self {
            Self::GenerateContentRequest(r) => r.to_bytes(),
            Self::ChatCompletionsRequest(r) => r.to_bytes(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderRequestError {
    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("no provider serves model '{0}'")]
    UnsupportedModel(String),
}
