use crate::app::chat::ChatOrchestrator;
use crate::config::toml_config::{JarvisConfig, ADMIN_LOGIN_ROUTE, CHAT_ROUTE};
use crate::core::rate_limiter::{client_identity, RateLimitDecision, RateLimitKey, RateLimitPolicy, RateLimiter};
use crate::domain::model::{ChatMessage, ChatReply};
use crate::domain::ports::MenuSource;
use crate::utils::error::{JarvisError, Result};
use reqwest::header::HeaderMap;
use std::collections::HashMap;

/// Rate-limited entry points. Every request is admitted by the limiter
/// before anything else runs.
pub struct Gateway {
    limiter: RateLimiter,
    policies: HashMap<String, RateLimitPolicy>,
    orchestrator: ChatOrchestrator,
    menu_source: Box<dyn MenuSource>,
}

impl Gateway {
    pub fn new(
        limiter: RateLimiter,
        policies: HashMap<String, RateLimitPolicy>,
        orchestrator: ChatOrchestrator,
        menu_source: Box<dyn MenuSource>,
    ) -> Self {
        Self {
            limiter,
            policies,
            orchestrator,
            menu_source,
        }
    }

    pub fn from_config(config: &JarvisConfig, limiter: RateLimiter, menu_source: Box<dyn MenuSource>) -> Self {
        Self::new(
            limiter,
            config.route_policies(),
            ChatOrchestrator::from_config(config),
            menu_source,
        )
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn policy(&self, route: &str) -> Option<&RateLimitPolicy> {
        self.policies.get(route)
    }

    /// Routes without a policy are admitted without being counted.
    pub fn admit(&self, route: &str, headers: &HeaderMap) -> Result<()> {
        let Some(policy) = self.policies.get(route) else {
            return Ok(());
        };

        let key = RateLimitKey::new(route, client_identity(headers));
        match self.limiter.check(&key, policy) {
            RateLimitDecision::Allowed { remaining } => {
                tracing::debug!("Admitted {} for {} ({} left)", route, key.client, remaining);
                Ok(())
            }
            RateLimitDecision::Limited { retry_after } => Err(JarvisError::RateLimited {
                route: route.to_string(),
                retry_after,
            }),
        }
    }

    /// Gate for the admin login handler; credential checks happen in the caller.
    pub fn admit_admin_login(&self, headers: &HeaderMap) -> Result<()> {
        self.admit(ADMIN_LOGIN_ROUTE, headers)
    }

    pub async fn chat(&self, headers: &HeaderMap, message: &str, history: &[ChatMessage]) -> Result<ChatReply> {
        self.chat_on(CHAT_ROUTE, headers, message, history).await
    }

    pub async fn chat_on(
        &self,
        route: &str,
        headers: &HeaderMap,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply> {
        self.admit(route, headers)?;

        let menu = self.menu_source.fetch_menu().await?;
        tracing::debug!("Menu snapshot has {} items", menu.len());

        Ok(self.orchestrator.handle(message, history, &menu).await)
    }
}
