use crate::configuration::LlmProvider;
use crate::errors::ConfigurationError;
use digestllm::clients::endpoints::streaming_endpoint;
use digestllm::{ProviderId, StreamingProtocol};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

/// Configured providers keyed by identity.
#[derive(Debug, Default)]
pub struct LlmProviders {
    providers: HashMap<ProviderId, Arc<LlmProvider>>,
}

/// Everything needed to open an upstream stream for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub id: ProviderId,
    pub model: String,
    pub base_url: Option<String>,
    pub access_key: Option<String>,
}

impl ResolvedProvider {
    pub fn protocol(&self) -> StreamingProtocol {
        self.id.protocol()
    }

    pub fn endpoint(&self) -> String {
        streaming_endpoint(self.id, self.base_url.as_deref(), &self.model)
    }

    /// Access key safe for logs.
    pub fn masked_key(&self) -> String {
        match self.access_key.as_deref() {
            Some(key) => mask_key(key),
            None => "<not set>".to_string(),
        }
    }
}

impl LlmProviders {
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolve `model` using the process environment for missing keys.
    pub fn resolve(&self, model: &str) -> Result<ResolvedProvider, ConfigurationError> {
        self.resolve_with(model, |name| env::var(name).ok())
    }

    /// Resolve `model` to its provider. A provider without a configured
    /// `access_key` takes it from `lookup_env(provider.api_key_env())`.
    pub fn resolve_with<F>(
        &self,
        model: &str,
        lookup_env: F,
    ) -> Result<ResolvedProvider, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let id = ProviderId::from_model(model)
            .ok_or_else(|| ConfigurationError::UnsupportedModel(model.to_string()))?;
        let configured = self.providers.get(&id);

        let access_key = configured
            .and_then(|p| p.access_key.clone())
            .filter(|k| !k.is_empty())
            .or_else(|| lookup_env(id.api_key_env()).filter(|k| !k.is_empty()));

        Ok(ResolvedProvider {
            id,
            model: model.to_string(),
            base_url: configured.and_then(|p| p.base_url.clone()),
            access_key,
        })
    }
}

impl TryFrom<Vec<LlmProvider>> for LlmProviders {
    type Error = ConfigurationError;

    fn try_from(llm_providers_config: Vec<LlmProvider>) -> Result<Self, Self::Error> {
        let mut providers = HashMap::new();
        for llm_provider in llm_providers_config {
            let id = llm_provider.to_provider_id()?;
            if providers.insert(id, Arc::new(llm_provider)).is_some() {
                return Err(ConfigurationError::DuplicateProvider(id.to_string()));
            }
        }
        Ok(LlmProviders { providers })
    }
}

/// Keep the first and last four characters of `key`.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
