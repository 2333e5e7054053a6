pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::{ChatOrchestrator, Gateway};
pub use config::JarvisConfig;
pub use crate::core::parser::parse_order;
pub use crate::core::provider_chain::ProviderChain;
pub use crate::core::rate_limiter::{RateLimitPolicy, RateLimitStore, RateLimiter};
pub use utils::error::{JarvisError, ProviderError, Result};
