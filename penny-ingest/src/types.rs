use serde::{Deserialize, Serialize};

/// A positioned piece of text as emitted by a PDF text layer.
///
/// `y` grows upwards (PDF user space), so reading order is y descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self { text: text.into(), x, y }
    }
}

/// Positioned fragments for a whole document, one list per page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentDocument {
    pub pages: Vec<Vec<TextFragment>>,
}
