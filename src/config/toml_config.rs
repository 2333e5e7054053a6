use crate::adapters::providers::{ProviderKind, ProviderSettings};
use crate::core::rate_limiter::RateLimitPolicy;
use crate::utils::error::{JarvisError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

pub const CHAT_ROUTE: &str = "/api/chat";
pub const ADMIN_LOGIN_ROUTE: &str = "/api/admin/login";

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JarvisConfig {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    pub menu: Option<MenuConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub name: Option<String>,
    pub canteen_name: Option<String>,
    pub system_prompt: Option<String>,
    pub fallback_message: Option<String>,
    pub provider_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub gemini: Option<ProviderConfig>,
    pub groq: Option<ProviderConfig>,
    pub cohere: Option<ProviderConfig>,
    pub claude: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub sweep_interval_seconds: Option<u64>,
    pub cleanup_horizon_seconds: Option<u64>,
    pub routes: Option<HashMap<String, RateLimitPolicy>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    pub source: String,
}

/// One provider slot resolved against config and environment.
#[derive(Debug, Clone)]
pub struct ProviderSlot {
    pub kind: ProviderKind,
    pub enabled: bool,
    pub settings: ProviderSettings,
}

impl JarvisConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(JarvisError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| JarvisError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GROQ_API_KEY})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn assistant_name(&self) -> &str {
        self.assistant.name.as_deref().unwrap_or("Jarvis")
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.assistant.provider_timeout_seconds.unwrap_or(15))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit.sweep_interval_seconds.unwrap_or(60))
    }

    pub fn cleanup_horizon(&self) -> Duration {
        Duration::from_secs(self.rate_limit.cleanup_horizon_seconds.unwrap_or(600))
    }

    /// Built-in route policies overlaid with the configured ones.
    pub fn route_policies(&self) -> HashMap<String, RateLimitPolicy> {
        let mut policies = HashMap::from([
            (ADMIN_LOGIN_ROUTE.to_string(), RateLimitPolicy::admin_login()),
            (CHAT_ROUTE.to_string(), RateLimitPolicy::chat()),
        ]);
        if let Some(routes) = &self.rate_limit.routes {
            policies.extend(routes.iter().map(|(route, policy)| (route.clone(), *policy)));
        }
        policies
    }

    pub fn menu_source(&self) -> Option<&str> {
        self.menu.as_ref().map(|m| m.source.as_str())
    }

    /// The four provider slots in fallback order.
    pub fn provider_slots(&self) -> Vec<ProviderSlot> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| {
                let config = self.provider_config(kind).cloned().unwrap_or_default();
                ProviderSlot {
                    kind,
                    enabled: config.enabled.unwrap_or(true),
                    settings: ProviderSettings::new(
                        resolve_api_key(config.api_key.as_deref(), kind.api_key_env()),
                        config.model.unwrap_or_else(|| kind.default_model().to_string()),
                        config.base_url.unwrap_or_else(|| kind.default_base_url().to_string()),
                    ),
                }
            })
            .collect()
    }

    fn provider_config(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        match kind {
            ProviderKind::Gemini => self.providers.gemini.as_ref(),
            ProviderKind::Groq => self.providers.groq.as_ref(),
            ProviderKind::Cohere => self.providers.cohere.as_ref(),
            ProviderKind::Claude => self.providers.claude.as_ref(),
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(name) = &self.assistant.name {
            validation::validate_non_empty_string("assistant.name", name)?;
        }

        if let Some(timeout) = self.assistant.provider_timeout_seconds {
            validation::validate_range("assistant.provider_timeout_seconds", timeout, 1, 300)?;
        }

        if let Some(interval) = self.rate_limit.sweep_interval_seconds {
            validation::validate_positive_number("rate_limit.sweep_interval_seconds", interval, 1)?;
        }

        let policies = self.route_policies();
        for (route, policy) in &policies {
            validation::validate_positive_number(
                &format!("rate_limit.routes.\"{}\".max_requests", route),
                policy.max_requests as u64,
                1,
            )?;
            validation::validate_positive_number(
                &format!("rate_limit.routes.\"{}\".window_ms", route),
                policy.window_ms,
                1,
            )?;
        }

        // the sweep must not outrun the longest window
        let longest_window_secs = policies
            .values()
            .map(|p| p.window_ms.div_ceil(1000))
            .max()
            .unwrap_or(0)
            .max(1);
        validation::validate_positive_number(
            "rate_limit.cleanup_horizon_seconds",
            self.cleanup_horizon().as_secs(),
            longest_window_secs,
        )?;

        for slot in self.provider_slots() {
            validation::validate_url(&format!("providers.{}.base_url", slot.kind.name()), &slot.settings.base_url)?;
        }

        if let Some(source) = self.menu_source() {
            if source.starts_with("http://") || source.starts_with("https://") {
                validation::validate_url("menu.source", source)?;
            } else {
                validation::validate_path("menu.source", source)?;
                validation::validate_file_extension("menu.source", source, &["json"])?;
            }
        }

        Ok(())
    }
}

/// A configured key wins unless blank or still an unresolved `${...}`
/// placeholder; then the conventional environment variable is consulted.
fn resolve_api_key(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|k| !k.is_empty() && !ENV_PLACEHOLDER.is_match(k))
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()))
}

impl Validate for JarvisConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
