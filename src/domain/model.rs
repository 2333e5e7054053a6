use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for a single ordered quantity.
pub const MAX_QUANTITY: u32 = 50;

/// One item intent extracted from a clause of the user's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedItem {
    raw_name: String,
    quantity: u32,
}

impl ParsedItem {
    /// Builds an item, clamping the quantity into `1..=MAX_QUANTITY`.
    /// Returns `None` when the name is blank.
    pub fn new(raw_name: impl Into<String>, quantity: u64) -> Option<Self> {
        let raw_name = raw_name.into();
        if raw_name.trim().is_empty() {
            return None;
        }
        Some(Self {
            raw_name,
            quantity: clamp_quantity(quantity),
        })
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

pub fn clamp_quantity(quantity: u64) -> u32 {
    quantity.clamp(1, MAX_QUANTITY as u64) as u32
}

/// Anything the matcher can resolve against. Only the display name is read.
pub trait MenuItemRef {
    fn display_name(&self) -> &str;
}

impl MenuItemRef for &str {
    fn display_name(&self) -> &str {
        self
    }
}

impl MenuItemRef for String {
    fn display_name(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl MenuItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            category: None,
            available: true,
        }
    }
}

impl MenuItemRef for MenuItem {
    fn display_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Text produced by the provider chain and who produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderResult {
    pub response_text: String,
    pub provider_name: String,
}

impl ProviderResult {
    pub fn is_fallback(&self) -> bool {
        self.provider_name == crate::core::provider_chain::FALLBACK_PROVIDER
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub item: MenuItem,
    pub quantity: u32,
}

impl OrderLine {
    pub fn subtotal(&self) -> f64 {
        self.item.price * self.quantity as f64
    }
}

/// Order the caller may hand to the order-placement service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderAction {
    pub lines: Vec<OrderLine>,
    pub total: f64,
}

impl OrderAction {
    pub fn from_lines(lines: Vec<OrderLine>) -> Option<Self> {
        if lines.is_empty() {
            return None;
        }
        let total = lines.iter().map(OrderLine::subtotal).sum();
        Some(Self { lines, total })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub reply: ChatMessage,
    pub provider: String,
    pub order: Option<OrderAction>,
    /// Parsed names with no matching menu item.
    pub unresolved: Vec<String>,
    /// Menu items that matched but are marked unavailable.
    pub unavailable: Vec<String>,
}
