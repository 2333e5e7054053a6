use crate::config::JarvisConfig;
use crate::core::matcher::find_menu_item;
use crate::core::parser::parse_order;
use crate::core::provider_chain::ProviderChain;
use crate::domain::model::{
    clamp_quantity, ChatMessage, ChatReply, MenuItem, OrderAction, OrderLine, ParsedItem,
};
use std::fmt::Write;

/// Outcome of matching parsed items against a menu snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedOrder {
    pub lines: Vec<OrderLine>,
    pub unresolved: Vec<String>,
    pub unavailable: Vec<String>,
}

/// Matches every parsed item; repeated hits on one menu item are merged.
pub fn resolve_items(parsed: &[ParsedItem], menu: &[MenuItem]) -> ResolvedOrder {
    let mut resolved = ResolvedOrder::default();

    for item in parsed {
        let Some(menu_item) = find_menu_item(item.raw_name(), menu).item() else {
            resolved.unresolved.push(item.raw_name().to_string());
            continue;
        };

        if !menu_item.available {
            if !resolved.unavailable.contains(&menu_item.name) {
                resolved.unavailable.push(menu_item.name.clone());
            }
            continue;
        }

        match resolved.lines.iter_mut().find(|l| l.item.name == menu_item.name) {
            Some(line) => {
                line.quantity = clamp_quantity(line.quantity as u64 + item.quantity() as u64);
            }
            None => resolved.lines.push(OrderLine {
                item: menu_item.clone(),
                quantity: item.quantity(),
            }),
        }
    }

    resolved
}

/// Builds the conversational reply for one chat turn.
pub struct ChatOrchestrator {
    chain: ProviderChain,
    assistant_name: String,
    canteen_name: Option<String>,
    persona: Option<String>,
}

impl ChatOrchestrator {
    pub fn new(chain: ProviderChain) -> Self {
        Self {
            chain,
            assistant_name: "Jarvis".to_string(),
            canteen_name: None,
            persona: None,
        }
    }

    /// Chain of the enabled providers in priority order, with the configured
    /// timeout, fallback text and persona.
    pub fn from_config(config: &JarvisConfig) -> Self {
        let providers = config
            .provider_slots()
            .into_iter()
            .filter(|slot| {
                if !slot.enabled {
                    tracing::info!("Provider {} disabled by configuration", slot.kind.name());
                }
                slot.enabled
            })
            .map(|slot| slot.kind.build(slot.settings))
            .collect();

        let mut chain = ProviderChain::new(providers).with_timeout(config.provider_timeout());
        if let Some(message) = &config.assistant.fallback_message {
            chain = chain.with_fallback_message(message.clone());
        }

        Self {
            chain,
            assistant_name: config.assistant_name().to_string(),
            canteen_name: config.assistant.canteen_name.clone(),
            persona: config.assistant.system_prompt.clone(),
        }
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn system_prompt(&self, menu: &[MenuItem], resolved: &ResolvedOrder) -> String {
        let mut prompt = match &self.persona {
            Some(persona) => persona.clone(),
            None => format!(
                "You are {}, the friendly ordering assistant for {}. Reply in the same language \
                 the customer uses (Hinglish or English) in at most three short sentences. \
                 Only suggest items from the menu below and never invent prices.",
                self.assistant_name,
                self.canteen_name.as_deref().unwrap_or("the college canteen")
            ),
        };

        prompt.push_str("\n\nMenu:\n");
        for item in menu.iter().filter(|i| i.available) {
            let _ = writeln!(prompt, "- {}: ₹{:.2}", item.name, item.price);
        }

        if let Some(order) = OrderAction::from_lines(resolved.lines.clone()) {
            prompt.push_str("\nItems detected in the latest message:\n");
            for line in &order.lines {
                let _ = writeln!(
                    prompt,
                    "- {} x {} = ₹{:.2}",
                    line.quantity,
                    line.item.name,
                    line.subtotal()
                );
            }
            let _ = writeln!(prompt, "Total: ₹{:.2}. Confirm this order with the customer.", order.total);
        }

        if !resolved.unresolved.is_empty() {
            let _ = writeln!(
                prompt,
                "\nNot on the menu: {}. Ask the customer what they meant.",
                resolved.unresolved.join(", ")
            );
        }

        if !resolved.unavailable.is_empty() {
            let _ = writeln!(
                prompt,
                "\nCurrently unavailable: {}. Suggest an alternative.",
                resolved.unavailable.join(", ")
            );
        }

        prompt
    }

    /// Parses and resolves `message`, then asks the provider chain for a
    /// reply. `history` is read, never modified.
    pub async fn handle(&self, message: &str, history: &[ChatMessage], menu: &[MenuItem]) -> ChatReply {
        let parsed = parse_order(message);
        let resolved = resolve_items(&parsed, menu);
        tracing::info!(
            "Parsed {} item(s): {} resolved, {} unresolved, {} unavailable",
            parsed.len(),
            resolved.lines.len(),
            resolved.unresolved.len(),
            resolved.unavailable.len()
        );

        let system_prompt = self.system_prompt(menu, &resolved);

        let mut conversation = history.to_vec();
        conversation.push(ChatMessage::user(message));

        let result = self.chain.respond(&conversation, &system_prompt).await;

        ChatReply {
            reply: ChatMessage::assistant(result.response_text),
            provider: result.provider_name,
            order: OrderAction::from_lines(resolved.lines),
            unresolved: resolved.unresolved,
            unavailable: resolved.unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ChatProvider;
    use crate::utils::error::ProviderError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records what it was asked and echoes a canned answer.
    struct RecordingProvider {
        seen: Arc<Mutex<Vec<(usize, String)>>>,
    }

    #[async_trait]
    impl ChatProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn invoke(&self, history: &[ChatMessage], system_prompt: &str) -> Result<String, ProviderError> {
            self.seen
                .lock()
                .unwrap()
                .push((history.len(), system_prompt.to_string()));
            Ok("Theek hai!".to_string())
        }
    }

    fn menu() -> Vec<MenuItem> {
        let mut cold_coffee = MenuItem::new("Cold Coffee", 40.0);
        cold_coffee.available = false;
        vec![
            MenuItem::new("Tea", 10.0),
            MenuItem::new("Masala Tea", 15.0),
            MenuItem::new("Samosa", 15.0),
            cold_coffee,
        ]
    }

    #[test]
    fn test_resolve_items_merges_and_flags() {
        let parsed = parse_order("2 tea, samosa, 3 tea, pizza, cold coffee");
        let resolved = resolve_items(&parsed, &menu());

        assert_eq!(resolved.lines.len(), 2);
        assert_eq!(resolved.lines[0].item.name, "Tea");
        assert_eq!(resolved.lines[0].quantity, 5);
        assert_eq!(resolved.lines[1].item.name, "Samosa");
        assert_eq!(resolved.unresolved, vec!["pizza".to_string()]);
        assert_eq!(resolved.unavailable, vec!["Cold Coffee".to_string()]);
    }

    #[test]
    fn test_merged_quantity_is_capped() {
        let parsed = parse_order("40 tea, 30 tea");
        let resolved = resolve_items(&parsed, &menu());
        assert_eq!(resolved.lines[0].quantity, 50);
    }

    #[tokio::test]
    async fn test_handle_builds_reply_and_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let chain = ProviderChain::new(vec![Box::new(RecordingProvider { seen: seen.clone() })]);
        let orchestrator = ChatOrchestrator::new(chain);
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("Namaste!")];

        let reply = orchestrator
            .handle("mujhe 2 samosa aur ek tea chahiye", &history, &menu())
            .await;

        assert_eq!(reply.provider, "recording");
        assert_eq!(reply.reply.content, "Theek hai!");
        let order = reply.order.expect("order detected");
        assert_eq!(order.total, 40.0);
        assert!(reply.unresolved.is_empty());

        let calls = seen.lock().unwrap();
        assert_eq!(calls[0].0, 3);
        assert!(calls[0].1.contains("- 2 x Samosa = ₹30.00"));
        assert!(calls[0].1.contains("Total: ₹40.00"));
        assert!(!calls[0].1.contains("Cold Coffee"));
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_small_talk_has_no_order() {
        let chain = ProviderChain::new(vec![]);
        let orchestrator = ChatOrchestrator::new(chain);

        let reply = orchestrator.handle("aur kya scene hai", &[], &[]).await;

        assert!(reply.order.is_none());
        assert_eq!(reply.provider, "fallback");
    }

    #[test]
    fn test_custom_persona_keeps_menu_context() {
        let mut config = JarvisConfig::default();
        config.assistant.system_prompt = Some("You are Friday.".to_string());
        let orchestrator = ChatOrchestrator::from_config(&config);

        let prompt = orchestrator.system_prompt(&menu(), &ResolvedOrder::default());
        assert!(prompt.starts_with("You are Friday."));
        assert!(prompt.contains("- Tea: ₹10.00"));
        assert_eq!(orchestrator.chain().provider_names(), vec!["gemini", "groq", "cohere", "claude"]);
    }
}
