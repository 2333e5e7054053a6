pub mod chat;
pub mod gateway;

pub use chat::{resolve_items, ChatOrchestrator, ResolvedOrder};
pub use gateway::Gateway;
