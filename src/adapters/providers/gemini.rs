use super::{default_client, dialogue, join_text_blocks, merged_system_prompt, send_json, ProviderSettings};
use crate::domain::model::{ChatMessage, Role};
use crate::domain::ports::ChatProvider;
use crate::utils::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub const NAME: &str = "gemini";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiProvider {
    settings: ProviderSettings,
    client: Client,
}

impl GeminiProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            client: default_client(),
        }
    }

    fn request_body(history: &[ChatMessage], system_prompt: &str) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = dialogue(history)
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        json!({
            "system_instruction": { "parts": [{ "text": merged_system_prompt(history, system_prompt) }] },
            "contents": contents,
        })
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn invoke(&self, history: &[ChatMessage], system_prompt: &str) -> Result<String, ProviderError> {
        let key = self.settings.require_key(NAME)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        );

        let request = self
            .client
            .post(url)
            .query(&[("key", key)])
            .json(&Self::request_body(history, system_prompt));

        let body = send_json(NAME, request).await?;
        let parts = body
            .pointer("/candidates/0/content/parts")
            .ok_or_else(|| ProviderError::MalformedResponse {
                provider: NAME.to_string(),
                message: "no candidates in response".to_string(),
            })?;
        join_text_blocks(NAME, Some(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_maps_roles() {
        let history = vec![ChatMessage::user("2 chai"), ChatMessage::assistant("Done")];
        let body = GeminiProvider::request_body(&history, "menu");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["system_instruction"]["parts"][0]["text"], "menu");
    }
}
