use crate::clients::endpoints::StreamingProtocol;
use std::fmt::Display;
use std::str::FromStr;

/// Provider identifier enum - simple enum for identifying providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Gemini,
    OpenAI,
    /// Served through an OpenAI-compatible chat completions endpoint.
    Anthropic,
}

impl ProviderId {
    /// Guess the provider from a model name, e.g. `gemini-2.5-flash` or
    /// `gpt-4o-mini`. Matching is case-insensitive; family names match
    /// anywhere, the `o1` series only as a prefix.
    pub fn from_model(model: &str) -> Option<Self> {
        let model = model.to_lowercase();
        if model.contains("gemini") {
            Some(ProviderId::Gemini)
        } else if model.contains("gpt") || model.starts_with("o1") || model.contains("chatgpt") {
            Some(ProviderId::OpenAI)
        } else if model.contains("claude") {
            Some(ProviderId::Anthropic)
        } else {
            None
        }
    }

    /// Wire protocol spoken by this provider's streaming endpoint.
    pub fn protocol(&self) -> StreamingProtocol {
        match self {
            ProviderId::Gemini => StreamingProtocol::Gemini,
            ProviderId::OpenAI | ProviderId::Anthropic => StreamingProtocol::OpenAICompatible,
        }
    }

    /// Environment variable holding the API key when configuration has none.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "GEMINI_API_KEY",
            ProviderId::OpenAI => "OPENAI_API_KEY",
            ProviderId::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn all() -> [ProviderId; 3] {
        [ProviderId::Gemini, ProviderId::OpenAI, ProviderId::Anthropic]
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "gemini" => Ok(ProviderId::Gemini),
            "openai" => Ok(ProviderId::OpenAI),
            "anthropic" => Ok(ProviderId::Anthropic),
            _ => Err(format!("Unknown provider: {}", value)),
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::Gemini => write!(f, "gemini"),
            ProviderId::OpenAI => write!(f, "openai"),
            ProviderId::Anthropic => write!(f, "anthropic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_provider_from_model_name() {
        assert_eq!(
            ProviderId::from_model("gemini-2.5-flash-lite"),
            Some(ProviderId::Gemini)
        );
        assert_eq!(ProviderId::from_model("Gemini-Pro"), Some(ProviderId::Gemini));
        assert_eq!(ProviderId::from_model("gpt-4o-mini"), Some(ProviderId::OpenAI));
        assert_eq!(ProviderId::from_model("o1-preview"), Some(ProviderId::OpenAI));
        assert_eq!(
            ProviderId::from_model("chatgpt-4o-latest"),
            Some(ProviderId::OpenAI)
        );
        assert_eq!(
            ProviderId::from_model("claude-3-5-sonnet"),
            Some(ProviderId::Anthropic)
        );
        assert_eq!(ProviderId::from_model("llama-3.1-70b"), None);
    }

    #[test]
    fn test_o1_matches_only_as_prefix() {
        assert_eq!(ProviderId::from_model("o1"), Some(ProviderId::OpenAI));
        assert_eq!(ProviderId::from_model("O1-mini"), Some(ProviderId::OpenAI));
        assert_eq!(ProviderId::from_model("qwen2.5-72b-o1-distill"), None);
        assert_eq!(ProviderId::from_model("yolo1-vision"), None);
    }

    #[test]
    fn test_protocol_mapping() {
        assert_eq!(ProviderId::Gemini.protocol(), StreamingProtocol::Gemini);
        assert_eq!(
            ProviderId::OpenAI.protocol(),
            StreamingProtocol::OpenAICompatible
        );
        assert_eq!(
            ProviderId::Anthropic.protocol(),
            StreamingProtocol::OpenAICompatible
        );
    }

    #[test]
    fn test_name_round_trip() {
        for provider in ProviderId::all() {
            assert_eq!(provider.to_string().parse::<ProviderId>(), Ok(provider));
        }
        assert_eq!("OpenAI".parse::<ProviderId>(), Ok(ProviderId::OpenAI));
        assert!("mistral".parse::<ProviderId>().is_err());
    }
}
