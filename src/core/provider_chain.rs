use crate::domain::model::{ChatMessage, ProviderResult};
use crate::domain::ports::ChatProvider;
use crate::utils::error::ProviderError;
use std::time::Duration;

/// Provider name reported when every provider failed.
pub const FALLBACK_PROVIDER: &str = "fallback";

pub const FALLBACK_MESSAGE: &str =
    "Sorry, I'm having trouble answering right now. Please try again in a moment or order from the menu directly.";

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Ordered list of chat providers tried one after another for every turn.
pub struct ProviderChain {
    providers: Vec<Box<dyn ChatProvider>>,
    timeout: Duration,
    fallback_message: String,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn ChatProvider>>) -> Self {
        Self {
            providers,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            fallback_message: FALLBACK_MESSAGE.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    async fn attempt(
        &self,
        provider: &dyn ChatProvider,
        history: &[ChatMessage],
        system_prompt: &str,
    ) -> Result<String, ProviderError> {
        let text = tokio::time::timeout(self.timeout, provider.invoke(history, system_prompt))
            .await
            .map_err(|_| ProviderError::Timeout {
                provider: provider.name().to_string(),
                timeout: self.timeout,
            })??;

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse {
                provider: provider.name().to_string(),
            });
        }
        Ok(text)
    }

    /// Returns the first non-blank answer, or the fallback message. Never fails.
    pub async fn respond(&self, history: &[ChatMessage], system_prompt: &str) -> ProviderResult {
        for provider in &self.providers {
            tracing::debug!("Asking provider {}", provider.name());
            match self.attempt(provider.as_ref(), history, system_prompt).await {
                Ok(text) => {
                    tracing::info!("Reply served by {}", provider.name());
                    return ProviderResult {
                        response_text: text,
                        provider_name: provider.name().to_string(),
                    };
                }
                Err(e) => {
                    tracing::warn!("Provider {} failed, trying next: {}", provider.name(), e);
                }
            }
        }

        tracing::warn!(
            "All {} providers failed, answering with fallback",
            self.providers.len()
        );
        ProviderResult {
            response_text: self.fallback_message.clone(),
            provider_name: FALLBACK_PROVIDER.to_string(),
        }
    }
}
