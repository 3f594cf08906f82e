//! Capital One US credit card statements.
//!
//! Expected text rows after linearization:
//!   Trans Date     Post Date      Description                                         Amount
//!   Jul 20         Jul 22         H-E-B #455SAN MARCOSTX                                $5.82
//!   Jul 28         Jul 29         WALMART.COMWALMART.COMAR                            - $14.05
//!
//! The transaction date comes first here, and a leading minus marks a credit.

use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;

use penny_core::{Statement, StatementKind, StatementPeriod, Transaction};

use crate::parsers::{build_card_transactions, today_period, StatementParser, TextSection};
use crate::segments::card_segments;
use crate::tokens::{month_from_abbrev, tokenize, DateStyle, TokenizerSpec};

const TOKENS: TokenizerSpec = TokenizerSpec {
    date_style: DateStyle::MonthDay,
    credit_marker: None,
};

const HEADER: &str = r"(?i)Trans\s+Date\s+Post\s+Date\s+Description\s+Amount";

pub struct CapitalOneParser {
    section: TextSection,
    period_re: Regex,
}

impl CapitalOneParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            section: TextSection::new(
                Some(HEADER),
                Some(r"(?i)\bTotal\s+Fees\s+Charged\b|\bInterest\s+Charge\s+Calculation\b"),
                &[
                    HEADER,
                    r"(?i)\bTotal\s+Transactions\s+for\s+This\s+Period\s+\$?[\d,]+\.\d{2}",
                    r"(?i)\bPayments,\s+Credits\s+and\s+Adjustments\b",
                    r"(?i)\bPage\s+\d+\s+of\s+\d+\b",
                ],
            )?,
            period_re: Regex::new(
                r"([A-Z][a-z]{2})[a-z]*\.?\s+(\d{1,2}),?\s*(\d{4})?\s*-\s*([A-Z][a-z]{2})[a-z]*\.?\s+(\d{1,2}),\s*(\d{4})",
            )?,
        })
    }
}

impl StatementParser for CapitalOneParser {
    fn id(&self) -> &'static str {
        "capital_one"
    }

    fn name(&self) -> &'static str {
        "Capital One (US)"
    }

    fn confidence(&self, first_page: &str) -> f64 {
        let upper = first_page.to_uppercase();
        let mut score: f64 = 0.0;
        if upper.contains("CAPITAL ONE") {
            score += 0.6;
        }
        if upper.contains("CAPITALONE.COM") {
            score += 0.2;
        }
        if upper.contains("TRANS DATE") && upper.contains("POST DATE") {
            score += 0.2;
        }
        score.min(1.0)
    }

    fn detect_statement_type(&self, _text: &str) -> StatementKind {
        StatementKind::CreditCard
    }

    fn extract_period(&self, text: &str) -> StatementPeriod {
        self.period_re
            .captures(text)
            .and_then(|c| {
                let end_month = month_from_abbrev(&c[4])?;
                let end_year: i32 = c[6].parse().ok()?;
                let end = NaiveDate::from_ymd_opt(end_year, end_month, c[5].parse().ok()?)?;

                let start_month = month_from_abbrev(&c[1])?;
                // "Dec 20 - Jan 19, 2025": the start year is implied.
                let start_year = match c.get(3) {
                    Some(y) => y.as_str().parse().ok()?,
                    None if start_month > end_month => end_year - 1,
                    None => end_year,
                };
                let start = NaiveDate::from_ymd_opt(start_year, start_month, c[2].parse().ok()?)?;
                Some(StatementPeriod::new(start, end))
            })
            .unwrap_or_else(today_period)
    }

    fn parse_transactions(
        &self,
        pages: &[String],
        kind: StatementKind,
        period: &StatementPeriod,
    ) -> Result<Vec<Transaction>> {
        let statement_id = Statement::make_id(self.id(), kind, period);
        let text = self.section.prepare(pages);
        let segments = card_segments(&tokenize(&text, &TOKENS))
            .into_iter()
            .map(|mut seg| {
                std::mem::swap(&mut seg.post_date, &mut seg.trans_date);
                seg
            })
            .collect();
        Ok(build_card_transactions(segments, &statement_id, period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use penny_core::Category;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parses_basic_rows() {
        let pages = vec![
            "Capital One Platinum Card Jul 06, 2024 - Aug 05, 2024 | 30 days in Billing Cycle \
             capitalone.com Transactions Trans Date Post Date Description Amount \
             Jul 20 Jul 22 H-E-B #455SAN MARCOSTX $5.82 \
             Jul 28 Jul 29 WALMART.COMWALMART.COMAR - $14.05 \
             Total Transactions for This Period $8.23"
                .to_string(),
        ];

        let p = CapitalOneParser::new().unwrap();
        assert!(p.confidence(&pages[0]) > 0.9);

        let stmt = p.parse_statement(&pages).unwrap();
        assert_eq!(stmt.kind, StatementKind::CreditCard);
        assert_eq!(stmt.period, StatementPeriod::new(ymd(2024, 7, 6), ymd(2024, 8, 5)));

        let txns = &stmt.transactions;
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].amount, -5.82);
        assert_eq!(txns[0].date, ymd(2024, 7, 20));
        assert!(txns[0].description.contains("H-E-B"));
        assert_eq!(txns[0].category, Category::Groceries);
        assert_eq!(txns[1].amount, 14.05);
        assert_eq!(txns[1].category, Category::Shopping);
    }

    #[test]
    fn test_transaction_date_before_new_year() {
        let p = CapitalOneParser::new().unwrap();
        let pages = vec![
            "Capital One Dec 20 - Jan 19, 2025 Trans Date Post Date Description Amount \
             Dec 30 Jan 02 SPOTIFY USA $10.99"
                .to_string(),
        ];
        let stmt = p.parse_statement(&pages).unwrap();
        assert_eq!(stmt.period.start, ymd(2024, 12, 20));
        assert_eq!(stmt.transactions.len(), 1);
        assert_eq!(stmt.transactions[0].date, ymd(2024, 12, 30));
        assert_eq!(stmt.transactions[0].amount, -10.99);
    }
}
