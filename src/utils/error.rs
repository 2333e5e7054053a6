use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JarvisError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Menu unavailable: {message}")]
    MenuError { message: String },

    #[error("Too many requests to {route}, retry after {}s", retry_after.as_secs())]
    RateLimited { route: String, retry_after: Duration },
}

/// Failures of a single chat provider call. These never leave the provider
/// chain; they are logged and the next provider is tried.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider}: no API key configured")]
    MissingCredential { provider: String },

    #[error("{provider}: request failed: {source}")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider}: upstream returned {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: malformed response: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("{provider}: empty response")]
    EmptyResponse { provider: String },

    #[error("{provider}: no answer within {}s", timeout.as_secs())]
    Timeout { provider: String, timeout: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Throttling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl JarvisError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            JarvisError::HttpError(_) | JarvisError::MenuError { .. } => ErrorCategory::Network,
            JarvisError::ConfigValidationError { .. }
            | JarvisError::InvalidConfigValueError { .. }
            | JarvisError::MissingConfigError { .. } => ErrorCategory::Configuration,
            JarvisError::IoError(_) | JarvisError::SerializationError(_) => ErrorCategory::Data,
            JarvisError::RateLimited { .. } => ErrorCategory::Throttling,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            JarvisError::RateLimited { .. } => ErrorSeverity::Low,
            JarvisError::HttpError(_) | JarvisError::MenuError { .. } => ErrorSeverity::Medium,
            JarvisError::IoError(_) | JarvisError::SerializationError(_) => ErrorSeverity::High,
            JarvisError::ConfigValidationError { .. }
            | JarvisError::InvalidConfigValueError { .. }
            | JarvisError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            JarvisError::HttpError(_) => "Check network connectivity and the upstream URL".to_string(),
            JarvisError::MenuError { .. } => {
                "Make sure the menu source exists and contains a JSON array of items".to_string()
            }
            JarvisError::IoError(_) => "Check that the file exists and is readable".to_string(),
            JarvisError::SerializationError(_) => "Check the JSON document for syntax errors".to_string(),
            JarvisError::RateLimited { retry_after, .. } => {
                format!("Wait {} seconds before trying again", retry_after.as_secs())
            }
            JarvisError::ConfigValidationError { .. }
            | JarvisError::InvalidConfigValueError { .. }
            | JarvisError::MissingConfigError { .. } => {
                "Review the configuration file against jarvis.example.toml".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            JarvisError::RateLimited { retry_after, .. } => format!(
                "Too many requests. Please try again in {} seconds.",
                retry_after.as_secs()
            ),
            JarvisError::MenuError { .. } | JarvisError::HttpError(_) => {
                "The menu could not be loaded right now.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Seconds a caller should wait, when the error is a throttling rejection.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            JarvisError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::MissingCredential { provider }
            | ProviderError::Http { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::MalformedResponse { provider, .. }
            | ProviderError::EmptyResponse { provider }
            | ProviderError::Timeout { provider, .. } => provider,
        }
    }
}

pub type Result<T> = std::result::Result<T, JarvisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_is_low_severity_throttling() {
        let err = JarvisError::RateLimited {
            route: "/api/chat".to_string(),
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(err.category(), ErrorCategory::Throttling);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
        assert!(err.user_friendly_message().contains("60 seconds"));
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = JarvisError::MissingConfigError {
            field: "menu.source".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.retry_after().is_none());
    }

    #[test]
    fn test_provider_error_names_provider() {
        let err = ProviderError::EmptyResponse {
            provider: "groq".to_string(),
        };
        assert_eq!(err.provider(), "groq");
        assert_eq!(err.to_string(), "groq: empty response");
    }
}
