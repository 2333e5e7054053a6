use super::{default_client, dialogue, merged_system_prompt, send_json, ProviderSettings};
use crate::domain::model::ChatMessage;
use crate::domain::ports::ChatProvider;
use crate::utils::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub const NAME: &str = "groq";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// OpenAI-compatible chat completions endpoint.
pub struct GroqProvider {
    settings: ProviderSettings,
    client: Client,
}

impl GroqProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            client: default_client(),
        }
    }

    fn request_body(&self, history: &[ChatMessage], system_prompt: &str) -> serde_json::Value {
        let mut messages = vec![json!({
            "role": "system",
            "content": merged_system_prompt(history, system_prompt),
        })];
        messages.extend(
            dialogue(history).map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
        );

        json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": 0.7,
            "max_tokens": 512,
        })
    }
}

#[async_trait]
impl ChatProvider for GroqProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn invoke(&self, history: &[ChatMessage], system_prompt: &str) -> Result<String, ProviderError> {
        let key = self.settings.require_key(NAME)?;
        let request = self
            .client
            .post(format!("{}/openai/v1/chat/completions", self.settings.base_url))
            .bearer_auth(key)
            .json(&self.request_body(history, system_prompt));

        let body = send_json(NAME, request).await?;
        body.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::MalformedResponse {
                provider: NAME.to_string(),
                message: "no choices in response".to_string(),
            })
    }
}
