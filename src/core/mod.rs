pub mod matcher;
pub mod parser;
pub mod provider_chain;
pub mod rate_limiter;

pub use crate::domain::model::{ChatMessage, MenuItem, ParsedItem, ProviderResult};
pub use crate::domain::ports::{ChatProvider, Clock, MenuSource};
pub use crate::utils::error::Result;
