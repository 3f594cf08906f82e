//! United Overseas Bank (Singapore) statements: deposit accounts and credit cards.
//!
//! Account rows after linearization:
//!   Date Description Withdrawals SGD Deposits SGD Balance SGD
//!   29 Dec Inward Credit-FAST 500.00 1,500.00 SALARY ACME PTE LTD OTHR 0001
//!   31 Dec NETS Debit-Consumer 25.30 1,474.70 NTUC FAIRPRICE TAMPINES 0012345
//!
//! Card rows:
//!   Post Date Trans Date Description of Transaction Transaction Amount SGD
//!   02 JAN 31 DEC GRAB* RIDE 12345 SINGAPORE SG 12.50
//!   03 JAN 03 JAN PAYMENT - THANK YOU 500.00 CR

use anyhow::Result;
use regex::Regex;

use penny_core::{Statement, StatementKind, StatementPeriod, Transaction};

use crate::config::ParserConfig;
use crate::parsers::{
    build_account_transactions, build_card_transactions, looks_like_inflow, month_ending,
    parse_day_month_year, today_period, StatementParser, TextSection,
};
use crate::segments::{account_segments, card_segments};
use crate::tokens::{tokenize, DateStyle, TokenizerSpec};

const TOKENS: TokenizerSpec = TokenizerSpec {
    date_style: DateStyle::DayMonth,
    credit_marker: Some("CR"),
};

const ACCOUNT_HEADER: &str =
    r"(?i)Date\s+Description\s+Withdrawals(?:\s*\(?SGD\)?)?\s+Deposits(?:\s*\(?SGD\)?)?\s+Balance(?:\s*\(?SGD\)?)?";
const CARD_HEADER: &str =
    r"(?i)Post\s+Date\s+Trans\s+Date\s+Description(?:\s+of\s+Transaction)?\s+(?:Transaction\s+)?Amount(?:\s*\(?SGD\)?)?";

const COMMON_BOILERPLATE: &[&str] = &[
    r"(?i)\bPage\s+\d+\s+of\s+\d+\b",
    r"(?i)\bUnited\s+Overseas\s+Bank\s+Limited\b",
    r"(?i)\bCo\.?\s*Reg\.?\s*No\.?\s*:?\s*\w+",
    r"(?i)\bStatement\s+of\s+Account\b",
    r"(?i)\bAccount\s+Transaction\s+Details\b",
];

pub struct UobParser {
    config: ParserConfig,
    account: TextSection,
    card: TextSection,
    word_re: Regex,
    card_columns_re: Regex,
    period_re: Regex,
    statement_date_re: Regex,
}

impl UobParser {
    pub fn new(config: ParserConfig) -> Result<Self> {
        let mut account_deny: Vec<&str> = vec![
            ACCOUNT_HEADER,
            r"(?i)\bBALANCE\s+B/F\b",
            r"(?i)\bBALANCE\s+C/F\b",
            r"(?i)\bTotal\s+[\d,]+\.\d{2}(?:\s+[\d,]+\.\d{2}){0,2}",
        ];
        account_deny.extend_from_slice(COMMON_BOILERPLATE);

        let mut card_deny: Vec<&str> = vec![
            CARD_HEADER,
            r"(?i)\bPREVIOUS\s+BALANCE\s+[\d,]+\.\d{2}(?:\s*CR)?",
            r"(?i)\bSUB\s*TOTAL\s+[\d,]+\.\d{2}(?:\s*CR)?",
            r"(?i)\bTOTAL\s+BALANCE\s+FOR\s+[A-Z' ]+?\s+[\d,]+\.\d{2}(?:\s*CR)?",
            r"(?i)\bRef\s+No\.?\s*:?\s*\d+",
        ];
        card_deny.extend_from_slice(COMMON_BOILERPLATE);

        Ok(Self {
            config,
            account: TextSection::new(
                Some(ACCOUNT_HEADER),
                Some(r"(?i)\bEnd\s+of\s+Transaction\s+Details\b"),
                &account_deny,
            )?,
            card: TextSection::new(
                Some(CARD_HEADER),
                Some(r"(?i)\bEnd\s+of\s+Transaction\s+Details\b"),
                &card_deny,
            )?,
            word_re: Regex::new(r"\bUOB\b")?,
            card_columns_re: Regex::new(r"(?i)\bPost\s+Date\s+Trans\s+Date\b")?,
            period_re: Regex::new(
                r"(?i)(\d{1,2})\s+([A-Za-z]{3,9})\s+(\d{4})\s*(?:to|-|–)\s*(\d{1,2})\s+([A-Za-z]{3,9})\s+(\d{4})",
            )?,
            statement_date_re: Regex::new(r"(?i)Statement\s+Date\s*:?\s*(\d{1,2})\s+([A-Za-z]{3,9})\s+(\d{4})")?,
        })
    }
}

impl StatementParser for UobParser {
    fn id(&self) -> &'static str {
        "uob"
    }

    fn name(&self) -> &'static str {
        "UOB (United Overseas Bank)"
    }

    fn confidence(&self, first_page: &str) -> f64 {
        let upper = first_page.to_uppercase();
        let mut score: f64 = 0.0;
        if upper.contains("UNITED OVERSEAS BANK") {
            score += 0.6;
        }
        if self.word_re.is_match(&upper) {
            score += 0.2;
        }
        if upper.contains("UOB.COM.SG") || upper.contains("UOBGROUP.COM") {
            score += 0.1;
        }
        if upper.contains("STATEMENT OF ACCOUNT") || upper.contains("CREDIT CARD") {
            score += 0.1;
        }
        score.min(1.0)
    }

    /// Card statements carry the two-date column header, or both a minimum
    /// payment and a credit limit. Card wording alone is not enough: account
    /// statements advertise cards too.
    fn detect_statement_type(&self, text: &str) -> StatementKind {
        let lower = text.to_lowercase();
        let card_summary = lower.contains("minimum payment") && lower.contains("credit limit");
        if self.card_columns_re.is_match(text) || card_summary {
            StatementKind::CreditCard
        } else {
            StatementKind::BankAccount
        }
    }

    fn extract_period(&self, text: &str) -> StatementPeriod {
        if let Some(c) = self.period_re.captures(text) {
            if let (Some(start), Some(end)) = (
                parse_day_month_year(&c[1], &c[2], &c[3]),
                parse_day_month_year(&c[4], &c[5], &c[6]),
            ) {
                return StatementPeriod::new(start, end);
            }
        }
        if let Some(c) = self.statement_date_re.captures(text) {
            if let Some(end) = parse_day_month_year(&c[1], &c[2], &c[3]) {
                return month_ending(end);
            }
        }
        today_period()
    }

    fn parse_transactions(
        &self,
        pages: &[String],
        kind: StatementKind,
        period: &StatementPeriod,
    ) -> Result<Vec<Transaction>> {
        let statement_id = Statement::make_id(self.id(), kind, period);
        let txns = match kind {
            StatementKind::BankAccount => {
                let text = self.account.prepare(pages);
                let segments = account_segments(&tokenize(&text, &TOKENS));
                build_account_transactions(segments, &statement_id, period, &self.config, |s| {
                    looks_like_inflow(&s.description)
                })
            }
            StatementKind::CreditCard => {
                let text = self.card.prepare(pages);
                let segments = card_segments(&tokenize(&text, &TOKENS));
                build_card_transactions(segments, &statement_id, period)
            }
        };
        Ok(txns)
    }
}
