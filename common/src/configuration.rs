use digestllm::apis::gemini::DEFAULT_GEMINI_MODEL;
use digestllm::{ProviderId, ReasoningMarkers};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use std::{env, fs};

use crate::consts::{
    BIND_ADDRESS_ENV, CONFIG_PATH_ENV, DEFAULT_BIND_ADDRESS, DEFAULT_CONFIG_PATH,
    DEFAULT_REQUEST_TIMEOUT_MS,
};
use crate::errors::ConfigurationError;

/// Built-in summarization instruction used when `system_prompt` is unset.
pub const DEFAULT_SYSTEM_PROMPT: &str = "我会给你发一篇帖子，可能会包含网友们的评论。\n\
用地道易懂的话总结这篇帖子。\n\
如果有网友评论的话，总结一下他们在讨论什么。\n\
如果网友们在争论的话，概括一下各方的论点。\n\
你的输出不要包含额外内容 (比如\"好的，没问题！我来帮你总结一下。\")";

fn default_version() -> String {
    "v0.1".to_string()
}

fn default_listener_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listener {
    #[serde(default = "default_listener_address")]
    pub address: String,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            address: default_listener_address(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmProvider {
    pub name: String,
    pub base_url: Option<String>,
    pub access_key: Option<String>,
}

impl LlmProvider {
    pub fn to_provider_id(&self) -> Result<ProviderId, ConfigurationError> {
        self.name
            .parse()
            .map_err(|_| ConfigurationError::UnknownProvider(self.name.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub listener: Listener,
    pub default_model: Option<String>,
    pub system_prompt: Option<String>,
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub model_providers: Vec<LlmProvider>,
    #[serde(default)]
    pub reasoning_markers: ReasoningMarkers,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            version: default_version(),
            listener: Listener::default(),
            default_model: None,
            system_prompt: None,
            request_timeout_ms: None,
            model_providers: Vec::new(),
            reasoning_markers: ReasoningMarkers::default(),
        }
    }
}

impl Configuration {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigurationError> {
        let config: Configuration = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            warn!(
                "configuration file {} not found, using defaults",
                path.display()
            );
            return Ok(Configuration::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&contents)?;
        info!(
            "loaded configuration {} with {} model provider(s)",
            path.display(),
            config.model_providers.len()
        );
        Ok(config)
    }

    /// Load from `DIGEST_CONFIG_PATH` and apply the `BIND_ADDRESS` override.
    pub fn load_from_env() -> Result<Self, ConfigurationError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;
        if let Ok(address) = env::var(BIND_ADDRESS_ENV) {
            config.listener.address = address;
        }
        Ok(config)
    }

    pub fn default_model(&self) -> &str {
        self.default_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_GEMINI_MODEL)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for provider in &self.model_providers {
            let id = provider.to_provider_id()?;
            if !seen.insert(id) {
                return Err(ConfigurationError::DuplicateProvider(provider.name.clone()));
            }
        }

        let markers = &self.reasoning_markers;
        if markers.start.is_empty() || markers.end.is_empty() {
            return Err(ConfigurationError::Invalid {
                why: "reasoning_markers.start and reasoning_markers.end must not be empty"
                    .to_string(),
            });
        }
        Ok(())
    }
}
