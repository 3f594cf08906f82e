//! Format-specific statement parsers and the shared extraction pipeline.
//!
//! Each format describes its text section, tokenizer and heuristics; the
//! segment machines and the sign / year / vendor passes below are shared.

pub mod capital_one_us;
pub mod chase_debit;
pub mod uob;

use anyhow::Result;
use chrono::{Datelike, Local, Months, NaiveDate};
use regex::Regex;
use tracing::{debug, info, warn};

use penny_core::{categorize_transaction, Statement, StatementKind, StatementPeriod, Transaction};

use crate::config::ParserConfig;
use crate::segments::{AccountSegment, CardSegment};
use crate::tokens::month_from_abbrev;
use crate::vendor::{account_vendor, card_merchant};

pub use capital_one_us::CapitalOneParser;
pub use chase_debit::ChaseParser;
pub use uob::UobParser;

/// A statement format. Implementations are registered once at startup.
pub trait StatementParser: Send + Sync {
    /// Stable short id, used in statement ids.
    fn id(&self) -> &'static str;

    /// Human-readable name for error messages.
    fn name(&self) -> &'static str;

    /// How sure this parser is that it understands the document, in [0, 1].
    fn confidence(&self, first_page: &str) -> f64;

    fn detect_statement_type(&self, text: &str) -> StatementKind;

    /// Statement period; today/today when no period is printed.
    fn extract_period(&self, text: &str) -> StatementPeriod;

    fn parse_transactions(
        &self,
        pages: &[String],
        kind: StatementKind,
        period: &StatementPeriod,
    ) -> Result<Vec<Transaction>>;

    /// Detect, extract the period and parse in one go.
    fn parse_statement(&self, pages: &[String]) -> Result<Statement> {
        let first = pages.first().map(String::as_str).unwrap_or_default();
        let kind = self.detect_statement_type(first);
        let period = self.extract_period(first);
        let transactions = self.parse_transactions(pages, kind, &period)?;
        let id = Statement::make_id(self.id(), kind, &period);
        info!(
            parser = self.id(),
            statement = %id,
            kind = kind.as_str(),
            transactions = transactions.len(),
            "parsed statement"
        );
        Ok(Statement {
            id,
            parser_id: self.id().to_string(),
            kind,
            period,
            transactions,
        })
    }
}

/// Where transactions live in the text and what boilerplate to drop.
pub(crate) struct TextSection {
    start: Option<Regex>,
    end: Option<Regex>,
    denylist: Vec<Regex>,
}

impl TextSection {
    pub(crate) fn new(start: Option<&str>, end: Option<&str>, denylist: &[&str]) -> Result<Self> {
        Ok(Self {
            start: start.map(Regex::new).transpose()?,
            end: end.map(Regex::new).transpose()?,
            denylist: denylist.iter().map(|p| Regex::new(p)).collect::<Result<_, _>>()?,
        })
    }

    /// Join pages, cut to the transaction section, blank out boilerplate.
    pub(crate) fn prepare(&self, pages: &[String]) -> String {
        let joined = pages.join(" ");
        let mut text = joined.as_str();

        if let Some(m) = self.start.as_ref().and_then(|re| re.find(text)) {
            text = &text[m.end()..];
        }
        if let Some(m) = self.end.as_ref().and_then(|re| re.find(text)) {
            text = &text[..m.start()];
        }

        let mut out = text.to_string();
        for re in &self.denylist {
            out = re.replace_all(&out, " ").into_owned();
        }
        out
    }
}

/// Descriptions that mean money came in, used when there is no prior balance.
pub(crate) const INFLOW_KEYWORDS: &[&str] = &[
    "inward", "deposit", "interest credit", "interest earned", "bonus interest", "salary",
    "payroll", "refund", "rebate", "reversal", "incoming",
];

pub(crate) fn looks_like_inflow(description: &str) -> bool {
    let lower = description.to_lowercase();
    INFLOW_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn is_interest_line(description: &str) -> bool {
    description.to_lowercase().contains("interest")
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub(crate) fn today_period() -> StatementPeriod {
    let today = Local::now().date_naive();
    StatementPeriod::new(today, today)
}

/// Parse `28 Dec 2024` (month name may be long: `28 December 2024`).
pub(crate) fn parse_day_month_year(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let month = month_from_abbrev(month.get(..3)?)?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

/// A period that ends on `end` and started one month earlier.
pub(crate) fn month_ending(end: NaiveDate) -> StatementPeriod {
    let start = end
        .checked_sub_months(Months::new(1))
        .and_then(|d| d.succ_opt())
        .unwrap_or(end);
    StatementPeriod::new(start, end)
}

/// Sign inference, noise filter, year assignment and vendor extraction for
/// bank-account segments.
///
/// Every entry after the first takes `balance - previous balance` as its
/// amount. The first uses `first_is_inflow` on the printed amount. Every row
/// moves the balance chain, dropped or not, so an amount is always the delta
/// from the row printed directly above it.
pub(crate) fn build_account_transactions(
    segments: Vec<AccountSegment>,
    statement_id: &str,
    period: &StatementPeriod,
    config: &ParserConfig,
    first_is_inflow: impl Fn(&AccountSegment) -> bool,
) -> Vec<Transaction> {
    let mut out = Vec::with_capacity(segments.len());
    let mut prev_balance: Option<f64> = None;

    for seg in segments {
        let amount = match prev_balance {
            Some(prev) => {
                let delta = round_cents(seg.balance - prev);
                if (delta.abs() - seg.printed_amount.abs()).abs() > config.balance_tolerance {
                    warn!(
                        description = %seg.description,
                        printed = seg.printed_amount,
                        delta,
                        "balance delta disagrees with printed amount"
                    );
                }
                delta
            }
            None => {
                let magnitude = seg.printed_amount.abs();
                if first_is_inflow(&seg) { magnitude } else { -magnitude }
            }
        };
        prev_balance = Some(seg.balance);

        if is_interest_line(&seg.description) && amount > 0.0 && amount < config.interest_noise_threshold {
            debug!(description = %seg.description, amount, "dropping non-material interest credit");
            continue;
        }

        let Some(date) = period.resolve(seg.date.month, seg.date.day) else {
            debug!(raw = %seg.raw, "invalid calendar date, skipping");
            continue;
        };

        let seq = out.len() + 1;
        let vendor = account_vendor(&seg.description, &seg.detail);
        let mut txn = Transaction::new(
            format!("{statement_id}-{seq:04}"),
            date,
            seg.description,
            amount,
            StatementKind::BankAccount,
            statement_id,
        )
        .with_vendor(vendor)
        .with_balance(seg.balance)
        .with_raw_text(seg.raw);
        categorize_transaction(&mut txn);
        out.push(txn);
    }

    out
}

/// Sign, year and merchant handling for card segments.
///
/// The year comes from the posting date; a transaction date in a later month
/// than its posting date belongs to the previous year (posted 02 Jan, made 31 Dec).
pub(crate) fn build_card_transactions(
    segments: Vec<CardSegment>,
    statement_id: &str,
    period: &StatementPeriod,
) -> Vec<Transaction> {
    let mut out = Vec::with_capacity(segments.len());

    for seg in segments {
        let Some(posted) = period.resolve(seg.post_date.month, seg.post_date.day) else {
            debug!(raw = %seg.raw, "invalid posting date, skipping");
            continue;
        };
        let year = if seg.trans_date.month > seg.post_date.month {
            posted.year() - 1
        } else {
            posted.year()
        };
        let Some(date) = NaiveDate::from_ymd_opt(year, seg.trans_date.month, seg.trans_date.day) else {
            debug!(raw = %seg.raw, "invalid transaction date, skipping");
            continue;
        };

        let magnitude = seg.printed_amount.abs();
        let credit = seg.credit || seg.printed_amount < 0.0;
        let amount = if credit { magnitude } else { -magnitude };

        let seq = out.len() + 1;
        let vendor = card_merchant(&seg.description);
        let mut txn = Transaction::new(
            format!("{statement_id}-{seq:04}"),
            date,
            seg.description,
            amount,
            StatementKind::CreditCard,
            statement_id,
        )
        .with_vendor(vendor)
        .with_raw_text(seg.raw);
        categorize_transaction(&mut txn);
        out.push(txn);
    }

    out
}
