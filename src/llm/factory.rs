//! LLM client factory.

use crate::config::LlmConfig;
use crate::error::{AskDbError, Result};
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates an LLM client for the given provider.
///
/// The OpenAI key is resolved from `api_key`, then `OPENAI_API_KEY`. The
/// model comes from `OPENAI_MODEL` when set, otherwise from `config`.
pub fn create_client(
    provider: LlmProvider,
    config: &LlmConfig,
    api_key: Option<String>,
) -> Result<Box<dyn LlmClient>> {
    match provider {
        LlmProvider::OpenAi => {
            let key = api_key
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    AskDbError::llm("No API key configured. Set OPENAI_API_KEY.")
                })?;
            let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| config.model.clone());
            Ok(Box::new(OpenAiClient::new(openai_config(config, key, model))?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

/// Applies the `[llm]` timeout and endpoint overrides.
fn openai_config(config: &LlmConfig, key: String, model: String) -> OpenAiConfig {
    let openai = OpenAiConfig::new(key, model).with_timeout(config.timeout_secs);
    match &config.base_url {
        Some(base_url) => openai.with_base_url(base_url.clone()),
        None => openai,
    }
}
