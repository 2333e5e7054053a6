//! Turns a free-form Hinglish/English order line into [`ParsedItem`]s.
//!
//! A line is split into clauses on `,` `&` newlines and the conjunctions
//! `aur`/`and`/`or`; each clause yields at most one item. Within a clause a
//! single quantity signal is consumed, in this order: a leading numeral
//! (`2 samosa`, `2x samosa`), a trailing numeral (`samosa 2`, `samosa x2`),
//! then a Hindi number word (`do samosa`). Filler tokens are transparent
//! when locating the leading and trailing positions and are stripped from
//! the remaining name.

use crate::domain::model::ParsedItem;
use regex::Regex;
use std::sync::LazyLock;

static CLAUSE_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[,&\n]|\s+(?:aur|and|or)\s+").expect("clause delimiter pattern is valid")
});

static LEADING_NUMERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[x×]?$").expect("leading numeral pattern is valid"));

static TRAILING_NUMERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[x×]?(\d+)$").expect("trailing numeral pattern is valid"));

const HINDI_NUMERALS: &[(&str, u64)] = &[
    ("ek", 1),
    ("do", 2),
    ("teen", 3),
    ("char", 4),
    ("chaar", 4),
    ("paanch", 5),
    ("panch", 5),
    ("chhe", 6),
    ("chhah", 6),
    ("che", 6),
    ("saat", 7),
    ("aath", 8),
    ("nau", 9),
    ("das", 10),
];

const FILLER_WORDS: &[&str] = &[
    // ordering verbs
    "karo", "kar", "kardo", "kariye", "de", "do", "dedo", "dena", "dijiye", "dijie", "lao",
    "laao", "bhejo", "add", "order", "get", "give", "want", "need", "chahiye", "chaiye",
    "chahie", "lena", "hai", "hain",
    // pronouns and possessives
    "mujhe", "muje", "hume", "humein", "hamein", "mera", "meri", "mere", "humara", "hamara",
    "i", "me", "my", "we", "us", "our", "you", "can",
    // units
    "packet", "packets", "plate", "plates", "glass", "glasses", "cup", "cups", "piece",
    "pieces", "pcs", "pc", "bowl", "bowls", "bottle", "bottles",
    // politeness and glue
    "please", "pls", "plz", "bhai", "bhaiya", "bhaiyya", "yaar", "ji", "thoda", "also", "bhi",
    "ka", "ki", "ke", "wala", "wali", "wale", "the", "a", "an", "of", "some", "for",
];

fn is_filler(token: &str) -> bool {
    FILLER_WORDS.contains(&token)
}

fn hindi_value(token: &str) -> Option<u64> {
    HINDI_NUMERALS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, value)| *value)
}

/// Digit runs too large for `u64` are still a quantity; clamping caps them.
fn parse_digits(digits: &str) -> u64 {
    digits.parse::<u64>().unwrap_or(u64::MAX)
}

/// The clauses of one input line. Cheap to copy; every call to `into_iter`
/// restarts from the beginning.
#[derive(Debug, Clone, Copy)]
pub struct Segments<'a> {
    text: &'a str,
}

pub struct SegmentIter<'a> {
    inner: regex::Split<'static, 'a>,
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        for clause in self.inner.by_ref() {
            let clause = clause.trim();
            if !clause.is_empty() {
                return Some(clause);
            }
        }
        None
    }
}

impl<'a> IntoIterator for Segments<'a> {
    type Item = &'a str;
    type IntoIter = SegmentIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        SegmentIter {
            inner: CLAUSE_DELIMITER.split(self.text),
        }
    }
}

pub fn split_segments(text: &str) -> Segments<'_> {
    Segments { text }
}

fn take_leading_numeral(tokens: &mut Vec<&str>) -> Option<u64> {
    let index = tokens.iter().position(|t| !is_filler(t))?;
    // a lone number is not "followed by whitespace"
    if index + 1 >= tokens.len() {
        return None;
    }
    let quantity = LEADING_NUMERAL
        .captures(tokens[index])
        .map(|caps| parse_digits(&caps[1]))?;
    tokens.remove(index);
    Some(quantity)
}

fn take_trailing_numeral(tokens: &mut Vec<&str>) -> Option<u64> {
    let index = tokens.iter().rposition(|t| !is_filler(t))?;
    let quantity = TRAILING_NUMERAL
        .captures(tokens[index])
        .map(|caps| parse_digits(&caps[1]))?;
    tokens.remove(index);
    // "samosa x 2"
    if index > 0 && matches!(tokens[index - 1], "x" | "×") {
        tokens.remove(index - 1);
    }
    Some(quantity)
}

fn take_hindi_numeral(tokens: &mut Vec<&str>) -> Option<u64> {
    let (index, quantity) = tokens
        .iter()
        .enumerate()
        .find_map(|(i, token)| hindi_value(token).map(|value| (i, value)))?;
    tokens.remove(index);
    Some(quantity)
}

/// Extracts the item named in one clause. Returns `None` when nothing but
/// quantities and filler words remain.
pub fn extract_item(clause: &str) -> Option<ParsedItem> {
    let lowered = clause.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();

    let quantity = take_leading_numeral(&mut tokens)
        .or_else(|| take_trailing_numeral(&mut tokens))
        .or_else(|| take_hindi_numeral(&mut tokens))
        .unwrap_or(1);

    let raw_name = tokens
        .into_iter()
        .filter(|token| !is_filler(token))
        .collect::<Vec<_>>()
        .join(" ");

    ParsedItem::new(raw_name, quantity)
}

/// Parses a whole order line, in clause order.
pub fn parse_order(text: &str) -> Vec<ParsedItem> {
    split_segments(text)
        .into_iter()
        .filter_map(|clause| {
            let item = extract_item(clause);
            if item.is_none() {
                tracing::debug!("Dropping clause with no item name: {:?}", clause);
            }
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, quantity: u32) -> (String, u32) {
        (name.to_string(), quantity)
    }

    fn parsed(text: &str) -> Vec<(String, u32)> {
        parse_order(text)
            .into_iter()
            .map(|p| (p.raw_name().to_string(), p.quantity()))
            .collect()
    }

    #[test]
    fn test_split_on_all_delimiters() {
        let clauses: Vec<&str> = split_segments("tea, samosa & vada pav\nchai aur maggi AND dosa or idli")
            .into_iter()
            .collect();
        assert_eq!(
            clauses,
            vec!["tea", "samosa", "vada pav", "chai", "maggi", "dosa", "idli"]
        );
    }

    #[test]
    fn test_split_keeps_conjunctions_inside_words() {
        let clauses: Vec<&str> = split_segments("orange juice, tandoori roti").into_iter().collect();
        assert_eq!(clauses, vec!["orange juice", "tandoori roti"]);
    }

    #[test]
    fn test_split_never_yields_blank_clauses() {
        for input in ["", "   ", ",,,", " & , \n ", "tea,, ,samosa", "aur and or", "\n\ntea\n"] {
            for clause in split_segments(input) {
                assert!(!clause.trim().is_empty(), "blank clause from {:?}", input);
                assert_eq!(clause, clause.trim());
            }
        }
        assert_eq!(split_segments("  \t ").into_iter().count(), 0);
    }

    #[test]
    fn test_segments_are_restartable() {
        let segments = split_segments("tea, coffee");
        let first: Vec<&str> = segments.into_iter().collect();
        let second: Vec<&str> = segments.into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_leading_numerals_per_clause() {
        assert_eq!(
            parsed("2 tea aur 3 samosa"),
            vec![item("tea", 2), item("samosa", 3)]
        );
    }

    #[test]
    fn test_trailing_numeral_forms() {
        assert_eq!(parsed("momos x2"), vec![item("momos", 2)]);
        assert_eq!(parsed("momos ×3"), vec![item("momos", 3)]);
        assert_eq!(parsed("momos 4"), vec![item("momos", 4)]);
        assert_eq!(parsed("momos x 5"), vec![item("momos", 5)]);
    }

    #[test]
    fn test_hindi_number_words() {
        assert_eq!(parsed("ek samosa"), vec![item("samosa", 1)]);
        assert_eq!(parsed("do samosa"), vec![item("samosa", 2)]);
        assert_eq!(parsed("teen cold coffee"), vec![item("cold coffee", 3)]);
        assert_eq!(parsed("maggi das"), vec![item("maggi", 10)]);
    }

    #[test]
    fn test_do_counts_wherever_it_appears() {
        // "do" is read as two even where it is the verb "give"
        assert_eq!(parsed("samosa do"), vec![item("samosa", 2)]);
        assert_eq!(parsed("samosa de do"), vec![item("samosa", 2)]);
        assert_eq!(parsed("chai do"), vec![item("chai", 2)]);
        // a digit wins, and the leftover "do" is stripped as filler
        assert_eq!(parsed("2 samosa de do"), vec![item("samosa", 2)]);
    }

    #[test]
    fn test_numeral_beats_hindi_word() {
        // only one quantity signal per clause
        assert_eq!(parsed("3 ek samosa"), vec![item("ek samosa", 3)]);
    }

    #[test]
    fn test_filler_words_are_stripped() {
        assert_eq!(parsed("mujhe 2 samosa chahiye"), vec![item("samosa", 2)]);
        assert_eq!(parsed("please add 1 plate momos"), vec![item("momos", 1)]);
        assert_eq!(parsed("Bhaiya do glass Cold Coffee dena"), vec![item("cold coffee", 2)]);
    }

    #[test]
    fn test_quantity_is_clamped() {
        assert_eq!(parsed("0 tea"), vec![item("tea", 1)]);
        assert_eq!(parsed("75 tea"), vec![item("tea", 50)]);
        assert_eq!(parsed("99999999999999999999999 tea"), vec![item("tea", 50)]);
    }

    #[test]
    fn test_quantity_always_in_range() {
        for input in ["tea", "0 tea", "tea 0", "1000 tea", "tea x999", "das tea", "tea 50", "51 tea"] {
            for p in parse_order(input) {
                assert!((1..=50).contains(&p.quantity()), "{:?} -> {}", input, p.quantity());
            }
        }
    }

    #[test]
    fn test_clause_without_name_is_dropped() {
        assert!(parsed("2").is_empty());
        assert!(parsed("please add karo").is_empty());
        assert_eq!(parsed("tea, please, 2 samosa"), vec![item("tea", 1), item("samosa", 2)]);
    }

    #[test]
    fn test_extraction_is_idempotent_on_clean_names() {
        for input in ["mujhe 2 samosa chahiye", "momos x2", "do masala dosa", "3 paneer tikka please"] {
            for p in parse_order(input) {
                let again = extract_item(p.raw_name()).unwrap();
                assert_eq!(again.raw_name(), p.raw_name());
                assert_eq!(again.quantity(), 1);
            }
        }
    }
}
