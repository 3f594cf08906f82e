//! Segment state machines over the token stream.
//!
//! Bank accounts: `Date → Description → Amount → Balance → Detail*`, where the
//! detail runs until the next date or the end of the document.
//! Cards: `PostDate → TransDate → Description → Amount → [Credit]`.
//!
//! A segment that breaks its pattern is dropped and scanning resumes at the
//! token that broke it.

use tracing::debug;

use crate::tokens::{Token, TokenKind, YearlessDate};

/// One bank-account entry as read from the text, before sign inference.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSegment {
    pub date: YearlessDate,
    pub description: String,
    /// Amount as printed (usually unsigned).
    pub printed_amount: f64,
    pub balance: f64,
    /// Trailing vendor / reference text.
    pub detail: String,
    pub raw: String,
}

/// One card entry as read from the text.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSegment {
    pub post_date: YearlessDate,
    pub trans_date: YearlessDate,
    pub description: String,
    pub printed_amount: f64,
    pub credit: bool,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
enum AccountState {
    Seek,
    Description { date: YearlessDate, words: Vec<String>, raw: Vec<String> },
    Amount { date: YearlessDate, words: Vec<String>, amount: f64, raw: Vec<String> },
    Detail { seg: AccountSegment, detail: Vec<String>, raw: Vec<String> },
}

/// Bank-account segment matcher.
#[derive(Debug)]
pub struct AccountMachine {
    state: AccountState,
    out: Vec<AccountSegment>,
    dropped: usize,
}

impl Default for AccountMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountMachine {
    pub fn new() -> Self {
        Self { state: AccountState::Seek, out: Vec::new(), dropped: 0 }
    }

    /// Segments abandoned because they broke the pattern.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn drop_partial(&mut self, why: &str) {
        if !matches!(self.state, AccountState::Seek) {
            debug!(state = ?self.state, why, "dropping incomplete account segment");
            self.dropped += 1;
        }
        self.state = AccountState::Seek;
    }

    fn start(&mut self, date: YearlessDate, tok: &Token) {
        self.state = AccountState::Description {
            date,
            words: Vec::new(),
            raw: vec![tok.text.clone()],
        };
    }

    pub fn feed(&mut self, tok: &Token) {
        let state = std::mem::replace(&mut self.state, AccountState::Seek);
        self.state = match (state, &tok.kind) {
            (AccountState::Detail { seg, detail, raw }, TokenKind::Date(date)) => {
                self.emit(seg, detail, raw);
                self.start(*date, tok);
                return;
            }
            (AccountState::Detail { seg, mut detail, mut raw }, _) => {
                detail.push(tok.text.clone());
                raw.push(tok.text.clone());
                AccountState::Detail { seg, detail, raw }
            }

            (AccountState::Seek, TokenKind::Date(date)) => {
                self.start(*date, tok);
                return;
            }
            (AccountState::Seek, _) => AccountState::Seek,

            (state @ AccountState::Description { .. }, TokenKind::Date(date))
            | (state @ AccountState::Amount { .. }, TokenKind::Date(date)) => {
                self.state = state;
                self.drop_partial("date before balance");
                self.start(*date, tok);
                return;
            }

            (AccountState::Description { date, words, mut raw }, TokenKind::Amount(amount)) => {
                if words.is_empty() {
                    self.state = AccountState::Description { date, words, raw };
                    self.drop_partial("amount without description");
                    return;
                }
                raw.push(tok.text.clone());
                AccountState::Amount { date, words, amount: *amount, raw }
            }
            (AccountState::Description { date, mut words, mut raw }, _) => {
                words.push(tok.text.clone());
                raw.push(tok.text.clone());
                AccountState::Description { date, words, raw }
            }

            (AccountState::Amount { date, words, amount, mut raw }, TokenKind::Amount(balance)) => {
                raw.push(tok.text.clone());
                let seg = AccountSegment {
                    date,
                    description: words.join(" "),
                    printed_amount: amount,
                    balance: *balance,
                    detail: String::new(),
                    raw: String::new(),
                };
                AccountState::Detail { seg, detail: Vec::new(), raw }
            }
            (state @ AccountState::Amount { .. }, _) => {
                self.state = state;
                self.drop_partial("second numeric token missing");
                return;
            }
        };
    }

    fn emit(&mut self, mut seg: AccountSegment, detail: Vec<String>, raw: Vec<String>) {
        seg.detail = detail.join(" ");
        seg.raw = raw.join(" ");
        self.out.push(seg);
    }

    pub fn finish(mut self) -> Vec<AccountSegment> {
        let state = std::mem::replace(&mut self.state, AccountState::Seek);
        match state {
            AccountState::Detail { seg, detail, raw } => self.emit(seg, detail, raw),
            other => {
                self.state = other;
                self.drop_partial("end of document");
            }
        }
        self.out
    }
}

/// Run the account machine over a token stream.
pub fn account_segments(tokens: &[Token]) -> Vec<AccountSegment> {
    let mut m = AccountMachine::new();
    for t in tokens {
        m.feed(t);
    }
    m.finish()
}

#[derive(Debug, Clone, PartialEq)]
enum CardState {
    Seek,
    PostDate { post: YearlessDate, raw: Vec<String> },
    Description { post: YearlessDate, trans: YearlessDate, words: Vec<String>, raw: Vec<String> },
    Priced { seg: CardSegment, raw: Vec<String> },
}

/// Card segment matcher.
#[derive(Debug)]
pub struct CardMachine {
    state: CardState,
    out: Vec<CardSegment>,
    dropped: usize,
}

impl Default for CardMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CardMachine {
    pub fn new() -> Self {
        Self { state: CardState::Seek, out: Vec::new(), dropped: 0 }
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn drop_partial(&mut self, why: &str) {
        if !matches!(self.state, CardState::Seek) {
            debug!(state = ?self.state, why, "dropping incomplete card segment");
            self.dropped += 1;
        }
        self.state = CardState::Seek;
    }

    fn emit(&mut self, mut seg: CardSegment, raw: Vec<String>) {
        seg.raw = raw.join(" ");
        self.out.push(seg);
    }

    pub fn feed(&mut self, tok: &Token) {
        let state = std::mem::replace(&mut self.state, CardState::Seek);
        self.state = match (state, &tok.kind) {
            (CardState::Seek, TokenKind::Date(post)) => CardState::PostDate {
                post: *post,
                raw: vec![tok.text.clone()],
            },
            (CardState::Seek, _) => CardState::Seek,

            (CardState::PostDate { post, mut raw }, TokenKind::Date(trans)) => {
                raw.push(tok.text.clone());
                CardState::Description { post, trans: *trans, words: Vec::new(), raw }
            }
            (state @ CardState::PostDate { .. }, _) => {
                self.state = state;
                self.drop_partial("transaction date missing");
                return;
            }

            (state @ CardState::Description { .. }, TokenKind::Date(post)) => {
                self.state = state;
                self.drop_partial("date before amount");
                CardState::PostDate { post: *post, raw: vec![tok.text.clone()] }
            }
            (CardState::Description { post, trans, words, mut raw }, TokenKind::Amount(amount)) => {
                if words.is_empty() {
                    self.state = CardState::Description { post, trans, words, raw };
                    self.drop_partial("amount without description");
                    return;
                }
                raw.push(tok.text.clone());
                let seg = CardSegment {
                    post_date: post,
                    trans_date: trans,
                    description: words.join(" "),
                    printed_amount: *amount,
                    credit: false,
                    raw: String::new(),
                };
                CardState::Priced { seg, raw }
            }
            (CardState::Description { post, trans, mut words, mut raw }, _) => {
                words.push(tok.text.clone());
                raw.push(tok.text.clone());
                CardState::Description { post, trans, words, raw }
            }

            (CardState::Priced { mut seg, mut raw }, TokenKind::Credit) => {
                seg.credit = true;
                raw.push(tok.text.clone());
                self.emit(seg, raw);
                CardState::Seek
            }
            (CardState::Priced { seg, raw }, TokenKind::Date(post)) => {
                self.emit(seg, raw);
                CardState::PostDate { post: *post, raw: vec![tok.text.clone()] }
            }
            (CardState::Priced { seg, raw }, _) => {
                self.emit(seg, raw);
                CardState::Seek
            }
        };
    }

    pub fn finish(mut self) -> Vec<CardSegment> {
        let state = std::mem::replace(&mut self.state, CardState::Seek);
        match state {
            CardState::Priced { seg, raw } => self.emit(seg, raw),
            other => {
                self.state = other;
                self.drop_partial("end of document");
            }
        }
        self.out
    }
}

/// Run the card machine over a token stream.
pub fn card_segments(tokens: &[Token]) -> Vec<CardSegment> {
    let mut m = CardMachine::new();
    for t in tokens {
        m.feed(t);
    }
    m.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{tokenize, DateStyle, TokenizerSpec};

    const SPEC: TokenizerSpec = TokenizerSpec {
        date_style: DateStyle::DayMonth,
        credit_marker: Some("CR"),
    };

    #[test]
    fn test_account_segment_with_detail() {
        let toks = tokenize(
            "02 Dec PayNow Transfer 50.00 950.00 OTHR JOHN TAN 12345 03 Dec Interest Credit 0.12 950.12",
            &SPEC,
        );
        let segs = account_segments(&toks);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].description, "PayNow Transfer");
        assert_eq!(segs[0].printed_amount, 50.0);
        assert_eq!(segs[0].balance, 950.0);
        assert_eq!(segs[0].detail, "OTHR JOHN TAN 12345");
        assert_eq!(segs[0].raw, "02 Dec PayNow Transfer 50.00 950.00 OTHR JOHN TAN 12345");
        assert_eq!(segs[1].detail, "");
    }

    #[test]
    fn test_account_segment_dropped_when_date_interrupts() {
        let mut m = AccountMachine::new();
        for t in tokenize("01 Dec Opening 1,000.00 02 Dec Cash 20.00 980.00", &SPEC) {
            m.feed(&t);
        }
        assert_eq!(m.dropped(), 1);
        let segs = m.finish();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].description, "Cash");
    }

    #[test]
    fn test_account_amount_without_description_is_dropped() {
        let segs = account_segments(&tokenize("01 Dec 1,000.00 02 Dec Cash 20.00 980.00", &SPEC));
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].balance, 980.0);
    }

    #[test]
    fn test_account_trailing_partial_is_dropped() {
        let segs = account_segments(&tokenize("02 Dec Cash 20.00 980.00 05 Dec Pending", &SPEC));
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn test_card_segments_with_credit_marker() {
        let toks = tokenize(
            "02 DEC 01 DEC GRAB* RIDE 12345 SINGAPORE SG 12.50 Ref No. : 7454 05 DEC 05 DEC PAYMENT - THANK YOU 500.00 CR",
            &SPEC,
        );
        let segs = card_segments(&toks);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].description, "GRAB* RIDE 12345 SINGAPORE SG");
        assert!(!segs[0].credit);
        assert_eq!(segs[1].description, "PAYMENT - THANK YOU");
        assert!(segs[1].credit);
        assert_eq!(segs[1].printed_amount, 500.0);
    }

    #[test]
    fn test_card_single_date_is_dropped() {
        let mut m = CardMachine::new();
        for t in tokenize("05 DEC STATEMENT 02 DEC 01 DEC SHOP 10.00", &SPEC) {
            m.feed(&t);
        }
        assert_eq!(m.dropped(), 1);
        let segs = m.finish();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].description, "SHOP");
    }
}
