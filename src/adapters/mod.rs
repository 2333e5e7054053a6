// Adapters layer: concrete implementations of the domain ports (chat providers, menu sources).

pub mod menu;
pub mod providers;
