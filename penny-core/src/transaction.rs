//! Transaction and statement types produced by the parsers and consumed downstream

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Which kind of statement a transaction was read from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StatementKind {
    #[serde(rename = "bank_account")]
    BankAccount,
    #[serde(rename = "credit_card")]
    CreditCard,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::BankAccount => "bank_account",
            StatementKind::CreditCard => "credit_card",
        }
    }
}

/// Provenance of a transaction's category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CategorySource {
    #[serde(rename = "rule")]
    Rule,
    #[serde(rename = "embedding")]
    Embedding,
    #[serde(rename = "user")]
    User,
}

/// Statement coverage window. Drives year assignment for yearless date tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatementPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl StatementPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Start and end fall in different calendar years.
    pub fn spans_year_boundary(&self) -> bool {
        self.start.year() < self.end.year()
    }

    /// Resolve the year for a yearless (month, day).
    ///
    /// Defaults to the end year; a month at or after the start month moves to
    /// the start year when the period crosses a year boundary.
    pub fn year_for_month(&self, month: u32) -> i32 {
        if self.spans_year_boundary() && month >= self.start.month() {
            self.start.year()
        } else {
            self.end.year()
        }
    }

    /// Build a full date from a yearless (month, day).
    pub fn resolve(&self, month: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year_for_month(month), month, day)
    }
}

/// A single parsed transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// `<statement id>-<sequence>`
    pub id: String,
    pub date: NaiveDate,
    /// Raw description as printed on the statement
    pub description: String,
    /// Normalized counterparty / merchant name, when one could be recovered
    pub vendor: Option<String>,
    /// Positive = inflow, negative = outflow
    pub amount: f64,
    /// Running balance (bank accounts only)
    pub balance: Option<f64>,
    pub category: Category,
    pub category_source: CategorySource,
    pub statement_kind: StatementKind,
    pub statement_id: String,
    /// The source text the parser matched for this entry
    pub raw_text: String,
    /// Hidden transactions are skipped by classification and aggregation
    #[serde(default)]
    pub hidden: bool,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        amount: f64,
        statement_kind: StatementKind,
        statement_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            description: description.into(),
            vendor: None,
            amount,
            balance: None,
            category: Category::Other,
            category_source: CategorySource::Rule,
            statement_kind,
            statement_id: statement_id.into(),
            raw_text: String::new(),
            hidden: false,
        }
    }

    pub fn with_vendor(mut self, vendor: Option<String>) -> Self {
        self.vendor = vendor;
        self
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_raw_text(mut self, raw: impl Into<String>) -> Self {
        self.raw_text = raw.into();
        self
    }

    /// Overwrite the category and record where it came from.
    pub fn set_category(&mut self, category: Category, source: CategorySource) {
        self.category = category;
        self.category_source = source;
    }

    /// Returns true if this is an outflow (negative amount)
    pub fn is_outflow(&self) -> bool {
        self.amount < 0.0
    }

    /// Returns true if this is an inflow (positive amount)
    pub fn is_inflow(&self) -> bool {
        self.amount > 0.0
    }

    /// Description and vendor joined, the text both classifier tiers look at.
    pub fn match_text(&self) -> String {
        match &self.vendor {
            Some(v) if !v.is_empty() => format!("{} {}", self.description, v),
            _ => self.description.clone(),
        }
    }
}

/// One parsed statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statement {
    pub id: String,
    pub parser_id: String,
    pub kind: StatementKind,
    pub period: StatementPeriod,
    pub transactions: Vec<Transaction>,
}

impl Statement {
    /// Deterministic identifier: parser, kind and period.
    pub fn make_id(parser_id: &str, kind: StatementKind, period: &StatementPeriod) -> String {
        let kind = match kind {
            StatementKind::BankAccount => "account",
            StatementKind::CreditCard => "card",
        };
        format!(
            "{}-{}-{}-{}",
            parser_id,
            kind,
            period.start.format("%Y%m%d"),
            period.end.format("%Y%m%d")
        )
    }

    /// Transactions not marked hidden.
    pub fn visible(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|t| !t.hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_year_boundary_resolution() {
        let period = StatementPeriod::new(ymd(2024, 12, 28), ymd(2025, 1, 5));
        assert!(period.spans_year_boundary());
        assert_eq!(period.resolve(12, 31), Some(ymd(2024, 12, 31)));
        assert_eq!(period.resolve(1, 2), Some(ymd(2025, 1, 2)));
    }

    #[test]
    fn test_same_year_period_uses_end_year() {
        let period = StatementPeriod::new(ymd(2025, 3, 1), ymd(2025, 3, 31));
        assert!(!period.spans_year_boundary());
        assert_eq!(period.year_for_month(3), 2025);
        assert_eq!(period.resolve(2, 30), None);
    }

    #[test]
    fn test_statement_id_is_deterministic() {
        let period = StatementPeriod::new(ymd(2024, 12, 28), ymd(2025, 1, 5));
        assert_eq!(
            Statement::make_id("uob", StatementKind::CreditCard, &period),
            "uob-card-20241228-20250105"
        );
    }

    #[test]
    fn test_transaction_serializes_snake_case_enums() {
        let t = Transaction::new("s-0001", ymd(2025, 1, 2), "GRAB* RIDE", -12.5, StatementKind::CreditCard, "s");
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["statement_kind"], "credit_card");
        assert_eq!(v["category_source"], "rule");
        assert_eq!(v["category"], "Other");
        assert!(t.is_outflow());
    }

    #[test]
    fn test_match_text_appends_vendor() {
        let t = Transaction::new("s-0001", ymd(2025, 1, 2), "PAYNOW TRANSFER", -20.0, StatementKind::BankAccount, "s")
            .with_vendor(Some("John Tan".to_string()));
        assert_eq!(t.match_text(), "PAYNOW TRANSFER John Tan");
    }
}
