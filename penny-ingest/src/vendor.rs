//! Counterparty / merchant name recovery from statement detail text.

use std::sync::OnceLock;

use penny_core::contains_at_word_start;
use regex::Regex;

/// Descriptions that mark a peer-to-peer or point-of-sale entry whose detail
/// text names the other party.
const TRANSFER_OR_POS_MARKERS: &[&str] = &[
    "paynow", "fast", "funds transfer", "funds trf", "transfer", "nets", "pos ", "debit purchase",
    "inward", "outward", "giro", "ibg", "bill payment", "e-payment", "zelle", "card transaction",
];

/// Codes and channel words that never belong to a name.
const NOISE_WORDS: &[&str] = &[
    "othr", "paynow", "fast", "transfer", "trf", "ref", "ref:", "no", "no.", "sgd", "usd", "nets",
    "pos", "via", "pib", "mbk", "ibg", "to", "from", "sg", "sgp", "singapore", "id", "id:", "web",
    "ppd", "sala", "payment", "debit", "credit", "inward", "outward", "ib", "giro", "-",
    ":", "purchase", "e-payment", "card", "ending", "in", "us", "usa", "bill",
];

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Any token carrying a digit is a reference, account or phone number.
    RE.get_or_init(|| Regex::new(r"\d").expect("reference regex"))
}

/// True when the description looks like a transfer or POS entry.
pub fn is_transfer_or_pos(description: &str) -> bool {
    let lower = format!("{} ", description.to_lowercase());
    TRANSFER_OR_POS_MARKERS.iter().any(|m| contains_at_word_start(&lower, m))
}

pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_words<'a>(text: &'a str, max_words: usize) -> Vec<&'a str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| c == ',' || c == ';' || c == '*'))
        .filter(|w| !w.is_empty())
        .filter(|w| !reference_re().is_match(w))
        .filter(|w| !NOISE_WORDS.contains(&w.to_lowercase().as_str()))
        .take(max_words)
        .collect()
}

/// Strip reference codes from transfer / POS detail text and title-case what remains.
pub fn extract_counterparty(detail: &str) -> Option<String> {
    let words = clean_words(detail, 5);
    if words.is_empty() {
        return None;
    }
    Some(title_case(&words.join(" ")))
}

/// Vendor for a bank-account entry: only transfer / POS entries carry one.
pub fn account_vendor(description: &str, detail: &str) -> Option<String> {
    if !is_transfer_or_pos(description) {
        return None;
    }
    extract_counterparty(detail)
}

/// Merchant name for a card entry: location suffixes and reference numbers removed.
pub fn card_merchant(description: &str) -> Option<String> {
    let words = clean_words(description, 4);
    if words.is_empty() {
        return None;
    }
    Some(title_case(&words.join(" ")))
}
