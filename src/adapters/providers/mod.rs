//! HTTP clients for the hosted chat models, in fallback priority order.

pub mod claude;
pub mod cohere;
pub mod gemini;
pub mod groq;

pub use claude::ClaudeProvider;
pub use cohere::CohereProvider;
pub use gemini::GeminiProvider;
pub use groq::GroqProvider;

use crate::domain::model::{ChatMessage, Role};
use crate::domain::ports::ChatProvider;
use crate::utils::error::ProviderError;
use reqwest::{Client, RequestBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Groq,
    Cohere,
    Claude,
}

impl ProviderKind {
    /// Fallback priority order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Gemini,
        ProviderKind::Groq,
        ProviderKind::Cohere,
        ProviderKind::Claude,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => gemini::NAME,
            ProviderKind::Groq => groq::NAME,
            ProviderKind::Cohere => cohere::NAME,
            ProviderKind::Claude => claude::NAME,
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::Cohere => "COHERE_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => gemini::DEFAULT_MODEL,
            ProviderKind::Groq => groq::DEFAULT_MODEL,
            ProviderKind::Cohere => cohere::DEFAULT_MODEL,
            ProviderKind::Claude => claude::DEFAULT_MODEL,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => gemini::DEFAULT_BASE_URL,
            ProviderKind::Groq => groq::DEFAULT_BASE_URL,
            ProviderKind::Cohere => cohere::DEFAULT_BASE_URL,
            ProviderKind::Claude => claude::DEFAULT_BASE_URL,
        }
    }

    pub fn build(&self, settings: ProviderSettings) -> Box<dyn ChatProvider> {
        match self {
            ProviderKind::Gemini => Box::new(GeminiProvider::new(settings)),
            ProviderKind::Groq => Box::new(GroqProvider::new(settings)),
            ProviderKind::Cohere => Box::new(CohereProvider::new(settings)),
            ProviderKind::Claude => Box::new(ClaudeProvider::new(settings)),
        }
    }
}

/// Connection details for one provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl ProviderSettings {
    pub fn new(api_key: Option<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn require_key(&self, provider: &str) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingCredential {
                provider: provider.to_string(),
            })
    }
}

/// Sends the request and decodes a JSON body, mapping every failure onto
/// [`ProviderError`].
pub(crate) async fn send_json(provider: &str, request: RequestBuilder) -> Result<serde_json::Value, ProviderError> {
    let response = request.send().await.map_err(|source| ProviderError::Http {
        provider: provider.to_string(),
        source,
    })?;

    let status = response.status();
    tracing::debug!("{} responded with {}", provider, status);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: body.chars().take(300).collect(),
        });
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| ProviderError::MalformedResponse {
            provider: provider.to_string(),
            message: e.to_string(),
        })
}

/// Joins the `text` fields of a JSON array of content blocks.
pub(crate) fn join_text_blocks(provider: &str, blocks: Option<&serde_json::Value>) -> Result<String, ProviderError> {
    let blocks = blocks
        .and_then(|b| b.as_array())
        .ok_or_else(|| ProviderError::MalformedResponse {
            provider: provider.to_string(),
            message: "missing content blocks".to_string(),
        })?;

    Ok(blocks
        .iter()
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}

/// Appends any system entries from the history to the prompt, for APIs that
/// take the system prompt out of band.
pub(crate) fn merged_system_prompt(history: &[ChatMessage], system_prompt: &str) -> String {
    let mut parts = vec![system_prompt.to_string()];
    parts.extend(
        history
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.clone()),
    );
    parts
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// User and assistant turns only.
pub(crate) fn dialogue(history: &[ChatMessage]) -> impl Iterator<Item = &ChatMessage> {
    history.iter().filter(|m| m.role != Role::System)
}

pub(crate) fn default_client() -> Client {
    Client::new()
}
