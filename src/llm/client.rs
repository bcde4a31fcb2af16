//! LLM client abstraction and provider selection.
//!
//! The assistant only needs text in, text out. Every provider implements
//! [`LLMClient`]; [`Provider`] picks one from configuration.

use crate::types::{AppError, Result};
use crate::utils::toml_config::LlmConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone, PartialEq)]
pub enum Provider {
    /// OpenAI API or any compatible endpoint
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Local Ollama server
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Resolve the `[llm]` section, reading API keys from the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        match config {
            LlmConfig::Ollama { base_url, model } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            }),
            LlmConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::Config(format!("environment variable '{}' is not set", api_key_env))
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.clone(),
                })
            }
        }
    }

    /// Create a client instance for this provider
    ///
    /// Fails if the provider's cargo feature is not compiled in.
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Arc::new(
                super::ollama::OllamaClient::new(base_url, model.clone())?,
            )),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Config(format!(
                "{} provider requires the `{}` feature",
                other.name(),
                other.name().to_lowercase()
            ))),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Configuration-based client factory
pub struct LLMClientFactory {
    default_provider: Provider,
}

impl LLMClientFactory {
    pub fn new(default_provider: Provider) -> Self {
        Self { default_provider }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(Provider::from_config(config)?))
    }

    /// Create a client using the default provider
    pub fn create_default(&self) -> Result<Arc<dyn LLMClient>> {
        self.default_provider.create_client()
    }

    pub fn default_provider(&self) -> &Provider {
        &self.default_provider
    }
}
