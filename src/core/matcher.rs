//! Resolves a parsed item name against the live menu.
//!
//! Tiers are tried in order and the first tier that produces a hit wins,
//! even when a later tier would have scored another item higher.

use crate::domain::model::MenuItemRef;

/// Minimum token-overlap score accepted by the last tier.
pub const OVERLAP_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchTier {
    Exact,
    Prefix,
    Contains,
    ContainedIn,
    TokenOverlap { score: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuMatch<'m, T> {
    Resolved { item: &'m T, tier: MatchTier },
    Unresolved,
}

impl<'m, T> MenuMatch<'m, T> {
    pub fn item(&self) -> Option<&'m T> {
        match self {
            MenuMatch::Resolved { item, .. } => Some(*item),
            MenuMatch::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, MenuMatch::Resolved { .. })
    }
}

/// Counts token pairs where either token contains the other, normalised by
/// the longer token list.
pub fn overlap_score(candidate: &str, item_name: &str) -> f64 {
    let candidate_tokens: Vec<&str> = candidate.split_whitespace().collect();
    let item_tokens: Vec<&str> = item_name.split_whitespace().collect();
    let longest = candidate_tokens.len().max(item_tokens.len());
    if longest == 0 {
        return 0.0;
    }

    let overlap = candidate_tokens
        .iter()
        .flat_map(|c| item_tokens.iter().map(move |i| (*c, *i)))
        .filter(|&(c, i)| c.contains(i) || i.contains(c))
        .count();

    overlap as f64 / longest as f64
}

pub fn find_menu_item<'m, T: MenuItemRef>(candidate: &str, menu: &'m [T]) -> MenuMatch<'m, T> {
    let candidate = candidate.trim().to_lowercase();
    if candidate.is_empty() || menu.is_empty() {
        return MenuMatch::Unresolved;
    }

    let names: Vec<String> = menu
        .iter()
        .map(|item| item.display_name().trim().to_lowercase())
        .collect();

    let tiers: [(MatchTier, fn(&str, &str) -> bool); 4] = [
        (MatchTier::Exact, |c, n| n == c),
        (MatchTier::Prefix, |c, n| n.starts_with(c)),
        (MatchTier::Contains, |c, n| n.contains(c)),
        (MatchTier::ContainedIn, |c, n| !n.is_empty() && c.contains(n)),
    ];

    for (tier, matches) in tiers {
        if let Some(index) = names.iter().position(|name| matches(&candidate, name)) {
            tracing::debug!("Matched {:?} to {:?} ({:?})", candidate, names[index], tier);
            return MenuMatch::Resolved {
                item: &menu[index],
                tier,
            };
        }
    }

    let mut best: Option<(usize, f64)> = None;
    for (index, name) in names.iter().enumerate() {
        let score = overlap_score(&candidate, name);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    match best {
        Some((index, score)) if score >= OVERLAP_THRESHOLD => {
            tracing::debug!("Matched {:?} to {:?} with overlap {:.2}", candidate, names[index], score);
            MenuMatch::Resolved {
                item: &menu[index],
                tier: MatchTier::TokenOverlap { score },
            }
        }
        _ => {
            tracing::debug!("No menu item for {:?}", candidate);
            MenuMatch::Unresolved
        }
    }
}
