use crate::domain::model::{ChatMessage, MenuItem};
use crate::utils::error::{ProviderError, Result};
use async_trait::async_trait;

/// An external conversational model that can answer one chat turn.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(
        &self,
        history: &[ChatMessage],
        system_prompt: &str,
    ) -> std::result::Result<String, ProviderError>;
}

/// Where the live menu snapshot comes from.
#[async_trait]
pub trait MenuSource: Send + Sync {
    async fn fetch_menu(&self) -> Result<Vec<MenuItem>>;
}

/// Millisecond wall clock; swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}
