//! Format detection: every registered parser scores the first page and the
//! most confident one at or above the threshold wins.

use tracing::{debug, info};

use penny_core::Statement;

use crate::config::ParserConfig;
use crate::error::IngestError;
use crate::parsers::{CapitalOneParser, ChaseParser, StatementParser, UobParser};

pub struct ParserRegistry {
    parsers: Vec<Box<dyn StatementParser>>,
    min_confidence: f64,
}

impl ParserRegistry {
    pub fn new(min_confidence: f64) -> Self {
        Self { parsers: Vec::new(), min_confidence }
    }

    /// Registry with every built-in format.
    pub fn with_defaults(config: &ParserConfig) -> anyhow::Result<Self> {
        let mut registry = Self::new(config.min_confidence);
        registry.register(Box::new(UobParser::new(config.clone())?));
        registry.register(Box::new(ChaseParser::new(config.clone())?));
        registry.register(Box::new(CapitalOneParser::new()?));
        Ok(registry)
    }

    pub fn register(&mut self, parser: Box<dyn StatementParser>) {
        debug!(parser = parser.id(), "registered statement parser");
        self.parsers.push(parser);
    }

    /// All parser scores for the page, in registration order.
    pub fn select_scored(&self, first_page: &str) -> Vec<(&'static str, f64)> {
        self.parsers
            .iter()
            .map(|p| (p.id(), p.confidence(first_page)))
            .collect()
    }

    /// Highest-confidence parser at or above the threshold. Ties keep the
    /// parser registered first.
    pub fn select(&self, first_page: &str) -> Option<&dyn StatementParser> {
        let mut best: Option<(usize, f64)> = None;
        for (i, (id, score)) in self.select_scored(first_page).into_iter().enumerate() {
            debug!(parser = id, score, "format confidence");
            if score < self.min_confidence {
                continue;
            }
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        best.map(|(i, _)| self.parsers[i].as_ref())
    }

    /// Names of every registered format, for error messages.
    pub fn supported_formats(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    /// Detect the format and parse every page into a statement.
    pub fn parse_document(&self, pages: &[String]) -> Result<Statement, IngestError> {
        let first = pages
            .first()
            .filter(|p| !p.trim().is_empty())
            .ok_or(IngestError::EmptyDocument)?;

        let parser = self.select(first).ok_or_else(|| IngestError::UnsupportedFormat {
            supported: self.supported_formats().join(", "),
        })?;
        info!(parser = parser.id(), "selected statement format");
        Ok(parser.parse_statement(pages)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use penny_core::{StatementKind, StatementPeriod, Transaction};

    struct Fixed {
        id: &'static str,
        score: f64,
    }

    impl StatementParser for Fixed {
        fn id(&self) -> &'static str {
            self.id
        }
        fn name(&self) -> &'static str {
            self.id
        }
        fn confidence(&self, _first_page: &str) -> f64 {
            self.score
        }
        fn detect_statement_type(&self, _text: &str) -> StatementKind {
            StatementKind::BankAccount
        }
        fn extract_period(&self, _text: &str) -> StatementPeriod {
            crate::parsers::today_period()
        }
        fn parse_transactions(
            &self,
            _pages: &[String],
            _kind: StatementKind,
            _period: &StatementPeriod,
        ) -> Result<Vec<Transaction>> {
            Ok(Vec::new())
        }
    }

    fn defaults() -> ParserRegistry {
        ParserRegistry::with_defaults(&ParserConfig::default()).unwrap()
    }

    #[test]
    fn test_selects_uob() {
        let registry = defaults();
        let parser = registry.select("UNITED OVERSEAS BANK LIMITED").unwrap();
        assert_eq!(parser.id(), "uob");
        let scores = registry.select_scored("UNITED OVERSEAS BANK LIMITED");
        assert!(scores.iter().any(|(id, s)| *id == "uob" && *s >= 0.5));
    }

    #[test]
    fn test_unknown_document_is_unsupported() {
        let registry = defaults();
        assert!(registry.select("ACME CREDIT UNION monthly statement").is_none());
        let err = registry
            .parse_document(&["ACME CREDIT UNION monthly statement".to_string()])
            .unwrap_err();
        match err {
            IngestError::UnsupportedFormat { supported } => {
                assert!(supported.contains("UOB"));
                assert!(supported.contains("Chase"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_document() {
        let registry = defaults();
        assert!(matches!(registry.parse_document(&[]), Err(IngestError::EmptyDocument)));
        assert!(matches!(
            registry.parse_document(&["   ".to_string()]),
            Err(IngestError::EmptyDocument)
        ));
    }

    #[test]
    fn test_threshold_and_ties() {
        let mut registry = ParserRegistry::new(0.5);
        registry.register(Box::new(Fixed { id: "low", score: 0.49 }));
        registry.register(Box::new(Fixed { id: "first", score: 0.7 }));
        registry.register(Box::new(Fixed { id: "second", score: 0.7 }));
        assert_eq!(registry.select("anything").unwrap().id(), "first");

        let mut only_low = ParserRegistry::new(0.5);
        only_low.register(Box::new(Fixed { id: "low", score: 0.49 }));
        assert!(only_low.select("anything").is_none());
    }

    #[test]
    fn test_parse_document_end_to_end() {
        let pages = vec![
            "UNITED OVERSEAS BANK LIMITED Period: 01 Mar 2025 to 31 Mar 2025 \
             Date Description Withdrawals SGD Deposits SGD Balance SGD \
             03 Mar NETS Debit-Consumer 12.00 988.00 COLD STORAGE JEM \
             05 Mar Funds Transfer 100.00 888.00 OTHR MARY LEE"
                .to_string(),
        ];
        let stmt = defaults().parse_document(&pages).unwrap();
        assert_eq!(stmt.parser_id, "uob");
        assert_eq!(stmt.kind, StatementKind::BankAccount);
        assert_eq!(stmt.transactions.len(), 2);
        assert_eq!(stmt.transactions[0].amount, -12.0);
        assert!((stmt.transactions[1].amount + 100.0).abs() < 0.001);
    }
}
