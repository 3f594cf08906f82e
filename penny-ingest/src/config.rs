use serde::{Deserialize, Serialize};

/// Layout reconstruction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Fragments whose y differs by less than this share a line.
    pub line_tolerance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { line_tolerance: 3.0 }
    }
}

/// Format detection and extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Minimum confidence a parser needs to be selected.
    pub min_confidence: f64,
    /// Interest credits below this magnitude are dropped.
    pub interest_noise_threshold: f64,
    /// Allowed gap between a balance delta and the printed amount before we warn.
    pub balance_tolerance: f64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            interest_noise_threshold: 0.50,
            balance_tolerance: 0.01,
        }
    }
}
