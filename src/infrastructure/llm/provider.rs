use std::time::Duration;

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::{anthropic, gemini, openai};

use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::{LlmConfig, LlmProvider};

enum ProviderHandle {
    OpenAi(openai::Client),
    Anthropic(anthropic::Client),
    Gemini(gemini::Client),
}

/// Chat completion through one of rig's provider clients.
pub struct RigLlm {
    client: ProviderHandle,
    model: String,
    max_tokens: u64,
    timeout: Duration,
}

impl RigLlm {
    /// Builds the provider client from its API key variable; validate the
    /// config before calling this.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = match config.provider {
            LlmProvider::OpenAi => ProviderHandle::OpenAi(openai::Client::from_env()),
            LlmProvider::Anthropic => ProviderHandle::Anthropic(anthropic::Client::from_env()),
            LlmProvider::Gemini => ProviderHandle::Gemini(gemini::Client::from_env()),
        };

        Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self.client {
            ProviderHandle::OpenAi(_) => "openai",
            ProviderHandle::Anthropic(_) => "anthropic",
            ProviderHandle::Gemini(_) => "gemini",
        }
    }
}

#[async_trait]
impl LlmService for RigLlm {
    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        let completion = async {
            match &self.client {
                ProviderHandle::OpenAi(client) => {
                    let agent = client
                        .agent(&self.model)
                        .preamble(system)
                        .max_tokens(self.max_tokens)
                        .build();
                    agent.prompt(prompt).await
                }
                ProviderHandle::Anthropic(client) => {
                    let agent = client
                        .agent(&self.model)
                        .preamble(system)
                        .max_tokens(self.max_tokens)
                        .build();
                    agent.prompt(prompt).await
                }
                ProviderHandle::Gemini(client) => {
                    let agent = client
                        .agent(&self.model)
                        .preamble(system)
                        .max_tokens(self.max_tokens)
                        .build();
                    agent.prompt(prompt).await
                }
            }
        };

        tokio::time::timeout(self.timeout, completion)
            .await
            .map_err(|_| DomainError::timeout("Chat completion timed out"))?
            .map_err(|e| DomainError::external(format!("{} completion failed: {e}", self.provider_name())))
    }
}
