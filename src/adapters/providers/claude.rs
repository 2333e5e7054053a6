use super::{default_client, dialogue, join_text_blocks, merged_system_prompt, send_json, ProviderSettings};
use crate::domain::model::ChatMessage;
use crate::domain::ports::ChatProvider;
use crate::utils::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub const NAME: &str = "claude";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    settings: ProviderSettings,
    client: Client,
}

impl ClaudeProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            client: default_client(),
        }
    }
}

#[async_trait]
impl ChatProvider for ClaudeProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn invoke(&self, history: &[ChatMessage], system_prompt: &str) -> Result<String, ProviderError> {
        let key = self.settings.require_key(NAME)?;

        let messages: Vec<serde_json::Value> = dialogue(history)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let request = self
            .client
            .post(format!("{}/v1/messages", self.settings.base_url))
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.settings.model,
                "max_tokens": 512,
                "system": merged_system_prompt(history, system_prompt),
                "messages": messages,
            }));

        let body = send_json(NAME, request).await?;
        join_text_blocks(NAME, body.get("content"))
    }
}
