//! LLM provider factory.
//!
//! Builds the configured [`LlmClient`] once at startup so request handlers
//! share one client (and its connection pool).

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use groundwork_core::config::LlmSettings;
use groundwork_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client from the LLM settings.
///
/// # Errors
/// Returns a configuration error if:
/// - Provider is unknown
/// - The provider needs an API key and none was resolved
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider).ok_or_else(|| {
        AppError::Config(format!("Unknown provider: {}", settings.provider))
    })?;

    match provider {
        ProviderType::Ollama => {
            let client = match settings.endpoint {
                Some(ref endpoint) => OllamaClient::with_base_url(endpoint.as_str()),
                None => OllamaClient::new(),
            };
            Ok(Arc::new(client))
        }
        ProviderType::OpenAI => {
            let api_key = settings.api_key.as_deref().ok_or_else(|| {
                AppError::Config(format!(
                    "OpenAI provider requires API key (set {})",
                    settings.api_key_env
                ))
            })?;
            let client = match settings.endpoint {
                Some(ref endpoint) => OpenAiClient::with_base_url(endpoint.as_str(), api_key),
                None => OpenAiClient::new(api_key),
            };
            Ok(Arc::new(client))
        }
    }
}
