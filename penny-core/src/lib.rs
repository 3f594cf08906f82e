//! penny-core: transaction model, category taxonomy and the deterministic rule tier

pub mod category;
pub mod rules;
pub mod transaction;

pub use category::{Category, UnknownCategory};
pub use rules::{categorize, categorize_transaction, contains_at_word_start};
pub use transaction::{CategorySource, Statement, StatementKind, StatementPeriod, Transaction};
