use common::configuration::Configuration;
use common::llm_providers::LlmProviders;

use crate::errors::SummarizerError;

/// Shared, read-only service state.
#[derive(Debug)]
pub struct AppState {
    pub config: Configuration,
    pub llm_providers: LlmProviders,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Configuration) -> Result<Self, SummarizerError> {
        let llm_providers = LlmProviders::try_from(config.model_providers.clone())?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| SummarizerError::UpstreamUnavailable(err.to_string()))?;

        Ok(Self {
            config,
            llm_providers,
            client,
        })
    }
}
