use super::{default_client, dialogue, join_text_blocks, merged_system_prompt, send_json, ProviderSettings};
use crate::domain::model::ChatMessage;
use crate::domain::ports::ChatProvider;
use crate::utils::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub const NAME: &str = "cohere";
pub const DEFAULT_BASE_URL: &str = "https://api.cohere.com";
pub const DEFAULT_MODEL: &str = "command-r";

pub struct CohereProvider {
    settings: ProviderSettings,
    client: Client,
}

impl CohereProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            client: default_client(),
        }
    }
}

#[async_trait]
impl ChatProvider for CohereProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn invoke(&self, history: &[ChatMessage], system_prompt: &str) -> Result<String, ProviderError> {
        let key = self.settings.require_key(NAME)?;

        let mut messages = vec![json!({
            "role": "system",
            "content": merged_system_prompt(history, system_prompt),
        })];
        messages.extend(
            dialogue(history).map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
        );

        let request = self
            .client
            .post(format!("{}/v2/chat", self.settings.base_url))
            .bearer_auth(key)
            .json(&json!({ "model": self.settings.model, "messages": messages }));

        let body = send_json(NAME, request).await?;
        join_text_blocks(NAME, body.pointer("/message/content"))
    }
}
