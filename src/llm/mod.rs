//! LLM integration for Pocket Assist.
//!
//! The rest of the crate only sees [`LanguageModel`]: a prompt goes in, a
//! stream of ever-growing response texts comes out. `AnthropicModel` backs it
//! with the Messages API over SSE and runs registered tools in between.

pub mod anthropic;
pub mod sse;
pub mod streaming;

pub use anthropic::AnthropicModel;
pub use streaming::{StreamUpdate, republish};

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;

use crate::config::{env_or, env_parse};
use crate::error::{ConfigError, LlmError};
use crate::tools::ToolRegistry;

/// Accumulated response texts; each item is the full text so far.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Language-generation collaborator.
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Start generating a response. The stream is lazy, finite, not
    /// restartable, and may fail midway.
    fn stream(&self, prompt: &str) -> TextStream;
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub api_url: String,
    pub anthropic_version: String,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;
        Ok(Self {
            api_key: secrecy::SecretString::from(api_key),
            model: env_or("POCKET_ASSIST_MODEL", "claude-sonnet-4-20250514"),
            api_url: env_or("ANTHROPIC_API_URL", "https://api.anthropic.com/v1/messages"),
            anthropic_version: env_or("ANTHROPIC_VERSION", "2023-06-01"),
            max_tokens: env_parse("POCKET_ASSIST_MAX_TOKENS", 1024)?,
            system_prompt: env_or(
                "POCKET_ASSIST_SYSTEM_PROMPT",
                crate::config::DEFAULT_SYSTEM_PROMPT,
            ),
        })
    }
}

/// Create the language model, optionally wired to a tool registry.
pub fn create_provider(
    config: &LlmConfig,
    tools: Option<Arc<ToolRegistry>>,
) -> Result<Arc<dyn LanguageModel>, LlmError> {
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: "anthropic".to_string(),
            reason: format!("Failed to create HTTP client: {}", e),
        })?;
    let mut model = AnthropicModel::new(http, config);
    if let Some(registry) = tools {
        model = model.with_tools(registry);
    }
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlmConfig {
        LlmConfig {
            api_key: secrecy::SecretString::from("test-key"),
            model: "claude-test".to_string(),
            api_url: "http://127.0.0.1:9/v1/messages".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            max_tokens: 256,
            system_prompt: "be brief".to_string(),
        }
    }

    #[test]
    fn test_create_provider_constructs_without_network() {
        let provider = create_provider(&config(), None).unwrap();
        assert_eq!(provider.model_name(), "claude-test");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_the_stream() {
        use futures::StreamExt;

        let provider = create_provider(&config(), None).unwrap();
        let mut stream = provider.stream("hi");
        match stream.next().await {
            Some(Err(LlmError::RequestFailed { provider, .. })) => assert_eq!(provider, "anthropic"),
            other => panic!("expected request failure, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }
}
