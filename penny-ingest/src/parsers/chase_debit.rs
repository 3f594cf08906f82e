//! Chase checking statements.
//!
//! Expected extracted-text section:
//!   TRANSACTION DETAIL
//!          DATE        DESCRIPTION                                     AMOUNT     BALANCE
//!          04/22       Discover     E-Payment 8148   Web ID: ...       -15.00      53.70
//!
//! Chase prints signed amounts, so the first entry keeps the printed sign and
//! later ones still come from the balance chain.

use anyhow::Result;
use regex::Regex;

use penny_core::{Statement, StatementKind, StatementPeriod, Transaction};

use crate::config::ParserConfig;
use crate::parsers::{
    build_account_transactions, parse_day_month_year, today_period, StatementParser, TextSection,
};
use crate::segments::account_segments;
use crate::tokens::{tokenize, DateStyle, TokenizerSpec};

const TOKENS: TokenizerSpec = TokenizerSpec {
    date_style: DateStyle::Slash,
    credit_marker: None,
};

pub struct ChaseParser {
    config: ParserConfig,
    section: TextSection,
    period_re: Regex,
}

impl ChaseParser {
    pub fn new(config: ParserConfig) -> Result<Self> {
        Ok(Self {
            config,
            section: TextSection::new(
                Some(r"(?i)TRANSACTION\s+DETAIL"),
                Some(r"(?i)\*end\*\s*transaction\s+detail"),
                &[
                    r"(?i)\bDATE\s+DESCRIPTION\s+AMOUNT\s+BALANCE\b",
                    r"(?i)\b(?:Beginning|Ending)\s+Balance\s+\$?[\d,]+\.\d{2}",
                    r"(?i)\bPage\s+\d+\s+of\s+\d+\b",
                    r"\*start\*\S*",
                ],
            )?,
            period_re: Regex::new(
                r"(?i)([A-Za-z]{3,9})\s+(\d{1,2}),\s*(\d{4})\s+through\s+([A-Za-z]{3,9})\s+(\d{1,2}),\s*(\d{4})",
            )?,
        })
    }
}

impl StatementParser for ChaseParser {
    fn id(&self) -> &'static str {
        "chase"
    }

    fn name(&self) -> &'static str {
        "Chase Checking"
    }

    fn confidence(&self, first_page: &str) -> f64 {
        let upper = first_page.to_uppercase();
        let mut score: f64 = 0.0;
        if upper.contains("JPMORGAN CHASE") {
            score += 0.6;
        }
        if upper.contains("CHASE.COM") {
            score += 0.2;
        }
        if upper.contains("TRANSACTION DETAIL") {
            score += 0.1;
        }
        if upper.contains("CHECKING SUMMARY") {
            score += 0.1;
        }
        score.min(1.0)
    }

    fn detect_statement_type(&self, _text: &str) -> StatementKind {
        StatementKind::BankAccount
    }

    fn extract_period(&self, text: &str) -> StatementPeriod {
        self.period_re
            .captures(text)
            .and_then(|c| {
                let start = parse_day_month_year(&c[2], &c[1], &c[3])?;
                let end = parse_day_month_year(&c[5], &c[4], &c[6])?;
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
        let segments = account_segments(&tokenize(&text, &TOKENS));
        Ok(build_account_transactions(
            segments,
            &statement_id,
            period,
            &self.config,
            |s| s.printed_amount > 0.0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use penny_core::Category;

    fn parser() -> ChaseParser {
        ChaseParser::new(ParserConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_chase_debit_basic() {
        let pages = vec![
            "JPMorgan Chase Bank, N.A. April 13, 2024 through May 10, 2024 chase.com \
             CHECKING SUMMARY Beginning Balance $68.70 \
             *start*transactiondetail TRANSACTION DETAIL DATE DESCRIPTION AMOUNT BALANCE \
             Beginning Balance $68.70 \
             04/22 Discover E-Payment 8148 Web ID: 123 -15.00 53.70 \
             04/23 PAYROLL ACME INC 100.00 153.70 \
             Ending Balance $153.70 *end*transaction detail"
                .to_string(),
        ];

        let p = parser();
        assert!(p.confidence(&pages[0]) >= 0.9);

        let stmt = p.parse_statement(&pages).unwrap();
        assert_eq!(stmt.id, "chase-account-20240413-20240510");
        let txns = &stmt.transactions;
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].amount, -15.00);
        assert_eq!(txns[0].balance, Some(53.70));
        assert_eq!(txns[0].date, NaiveDate::from_ymd_opt(2024, 4, 22).unwrap());
        assert!((txns[1].amount - 100.00).abs() < 0.001);
        assert_eq!(txns[1].balance, Some(153.70));
        assert_eq!(txns[1].category, Category::Income);
    }

    #[test]
    fn test_period_across_new_year() {
        let p = parser();
        let pages = vec![
            "December 14, 2024 through January 13, 2025 TRANSACTION DETAIL \
             12/20 Card Purchase Starbucks Store 1234 -6.50 93.50 \
             01/02 Zelle Payment To Mary Lee -20.00 73.50"
                .to_string(),
        ];
        let stmt = p.parse_statement(&pages).unwrap();
        assert_eq!(stmt.transactions.len(), 2);
        assert_eq!(stmt.transactions[0].date, NaiveDate::from_ymd_opt(2024, 12, 20).unwrap());
        assert_eq!(stmt.transactions[1].date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert!((stmt.transactions[1].amount + 20.0).abs() < 0.001);
    }

    #[test]
    fn test_not_chase() {
        assert_eq!(parser().confidence("UNITED OVERSEAS BANK"), 0.0);
    }
}
