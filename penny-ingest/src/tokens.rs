//! Tokenizer for linearized statement text.
//!
//! Statement text arrives as whitespace-separated words with no reliable line
//! structure, so extraction works on a token stream instead of lines:
//! yearless dates, money amounts, credit markers and everything else.

use std::sync::OnceLock;

use regex::Regex;

/// How a format prints its yearless dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `02 Dec`
    DayMonth,
    /// `Jul 20`
    MonthDay,
    /// `04/22` (month/day)
    Slash,
}

/// Per-format tokenizer settings.
#[derive(Debug, Clone, Copy)]
pub struct TokenizerSpec {
    pub date_style: DateStyle,
    /// Suffix marking a credit entry, e.g. `CR`. Also recognised glued to the amount (`12.00CR`).
    pub credit_marker: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearlessDate {
    pub month: u32,
    pub day: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Date(YearlessDate),
    /// Amount as printed, sign included (`-15.00`, `- $14.05`).
    Amount(f64),
    Credit,
    Word,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token (two words for split dates).
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    pub fn is_date(&self) -> bool {
        matches!(self.kind, TokenKind::Date(_))
    }
}

pub fn month_from_abbrev(s: &str) -> Option<u32> {
    let lower = s.to_ascii_lowercase();
    let m = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    // Only the bare abbreviation counts; "December" or "Decathlon" are words.
    if lower.len() == 3 { Some(m) } else { None }
}

fn parse_day(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let d: u32 = s.parse().ok()?;
    (1..=31).contains(&d).then_some(d)
}

fn parse_slash_date(s: &str) -> Option<YearlessDate> {
    let (m, d) = s.split_once('/')?;
    if m.len() != 2 || d.len() != 2 {
        return None;
    }
    let month: u32 = m.parse().ok()?;
    let day = parse_day(d)?;
    (1..=12).contains(&month).then_some(YearlessDate { month, day })
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<neg>-)?\$?(?P<num>\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})(?P<suffix>[A-Za-z]{2})?$")
            .expect("amount regex")
    })
}

/// Parse a money token. Returns the signed value and any glued suffix.
pub fn parse_amount(s: &str) -> Option<(f64, Option<&str>)> {
    let caps = amount_re().captures(s)?;
    let num = caps.name("num")?.as_str().replace(',', "");
    let mut value: f64 = num.parse().ok()?;
    if caps.name("neg").is_some() {
        value = -value;
    }
    Some((value, caps.name("suffix").map(|m| m.as_str())))
}

/// Split text into tokens for the given format.
pub fn tokenize(text: &str, spec: &TokenizerSpec) -> Vec<Token> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out = Vec::with_capacity(words.len());
    let mut i = 0;

    while i < words.len() {
        let w = words[i];
        let next = words.get(i + 1).copied();

        match spec.date_style {
            DateStyle::DayMonth => {
                if let (Some(day), Some(month)) = (parse_day(w), next.and_then(month_from_abbrev)) {
                    out.push(Token::new(
                        TokenKind::Date(YearlessDate { month, day }),
                        format!("{} {}", w, next.unwrap_or_default()),
                    ));
                    i += 2;
                    continue;
                }
            }
            DateStyle::MonthDay => {
                if let (Some(month), Some(day)) = (month_from_abbrev(w), next.and_then(parse_day)) {
                    out.push(Token::new(
                        TokenKind::Date(YearlessDate { month, day }),
                        format!("{} {}", w, next.unwrap_or_default()),
                    ));
                    i += 2;
                    continue;
                }
            }
            DateStyle::Slash => {
                if let Some(date) = parse_slash_date(w) {
                    out.push(Token::new(TokenKind::Date(date), w));
                    i += 1;
                    continue;
                }
            }
        }

        // "- $14.05": a lone minus sign binds to the amount after it.
        if w == "-" {
            if let Some((value, None)) = next.and_then(parse_amount) {
                out.push(Token::new(
                    TokenKind::Amount(-value.abs()),
                    format!("- {}", next.unwrap_or_default()),
                ));
                i += 2;
                continue;
            }
        }

        if let Some((value, suffix)) = parse_amount(w) {
            match (suffix, spec.credit_marker) {
                (None, _) => out.push(Token::new(TokenKind::Amount(value), w)),
                (Some(sfx), Some(marker)) if sfx.eq_ignore_ascii_case(marker) => {
                    out.push(Token::new(TokenKind::Amount(value), &w[..w.len() - sfx.len()]));
                    out.push(Token::new(TokenKind::Credit, sfx));
                }
                _ => out.push(Token::new(TokenKind::Word, w)),
            }
            i += 1;
            continue;
        }

        if spec.credit_marker.is_some_and(|m| w.eq_ignore_ascii_case(m)) {
            out.push(Token::new(TokenKind::Credit, w));
        } else {
            out.push(Token::new(TokenKind::Word, w));
        }
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MONTH: TokenizerSpec = TokenizerSpec {
        date_style: DateStyle::DayMonth,
        credit_marker: Some("CR"),
    };

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn test_day_month_dates_and_amounts() {
        let toks = tokenize("02 Dec NETS Debit 25.30 1,474.70", &DAY_MONTH);
        assert_eq!(
            kinds(&toks),
            vec![
                TokenKind::Date(YearlessDate { month: 12, day: 2 }),
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Amount(25.30),
                TokenKind::Amount(1474.70),
            ]
        );
        assert_eq!(toks[0].text, "02 Dec");
    }

    #[test]
    fn test_credit_marker_standalone_and_glued() {
        let toks = tokenize("PAYMENT 100.00 CR REFUND 5.00CR", &DAY_MONTH);
        assert_eq!(
            kinds(&toks),
            vec![
                TokenKind::Word,
                TokenKind::Amount(100.0),
                TokenKind::Credit,
                TokenKind::Word,
                TokenKind::Amount(5.0),
                TokenKind::Credit,
            ]
        );
    }

    #[test]
    fn test_month_names_that_are_words_stay_words() {
        let toks = tokenize("12 December 12 Decathlon", &DAY_MONTH);
        assert!(toks.iter().all(|t| t.kind == TokenKind::Word));
    }

    #[test]
    fn test_numbers_without_cents_are_words() {
        let toks = tokenize("REF 12345 2024", &DAY_MONTH);
        assert!(toks.iter().all(|t| t.kind == TokenKind::Word));
    }

    #[test]
    fn test_month_day_with_detached_minus() {
        let spec = TokenizerSpec { date_style: DateStyle::MonthDay, credit_marker: None };
        let toks = tokenize("Jul 28 Jul 29 WALMART.COM - $14.05", &spec);
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[0].kind, TokenKind::Date(YearlessDate { month: 7, day: 28 }));
        assert_eq!(toks[3].kind, TokenKind::Amount(-14.05));
    }

    #[test]
    fn test_slash_dates() {
        let spec = TokenizerSpec { date_style: DateStyle::Slash, credit_marker: None };
        let toks = tokenize("04/22 Discover -15.00 53.70 13/40", &spec);
        assert_eq!(toks[0].kind, TokenKind::Date(YearlessDate { month: 4, day: 22 }));
        assert_eq!(toks[2].kind, TokenKind::Amount(-15.0));
        assert_eq!(toks[4].kind, TokenKind::Word);
    }
}
