//! Layout reconstruction: positioned fragments → one reading-order string per page.
//!
//! Purely geometric. Fragments are ordered top to bottom, grouped into lines
//! by a y tolerance band, ordered left to right within a line, and joined
//! with single spaces.

use crate::types::{FragmentDocument, TextFragment};

/// Linearize one page. Empty input gives an empty string.
pub fn reconstruct_page(fragments: &[TextFragment], line_tolerance: f64) -> String {
    let mut frags: Vec<&TextFragment> = fragments.iter().filter(|f| !f.text.trim().is_empty()).collect();
    frags.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut lines: Vec<Vec<&TextFragment>> = Vec::new();
    let mut line_y = f64::NAN;
    for f in frags {
        if let Some(line) = lines.last_mut().filter(|_| (line_y - f.y).abs() < line_tolerance) {
            line.push(f);
        } else {
            line_y = f.y;
            lines.push(vec![f]);
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            line.iter().map(|f| f.text.trim()).collect::<Vec<_>>().join(" ")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Linearize every page of a document.
pub fn reconstruct_document(doc: &FragmentDocument, line_tolerance: f64) -> Vec<String> {
    doc.pages
        .iter()
        .map(|page| reconstruct_page(page, line_tolerance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, x: f64, y: f64) -> TextFragment {
        TextFragment::new(text, x, y)
    }

    #[test]
    fn test_empty_page() {
        assert_eq!(reconstruct_page(&[], 3.0), "");
        assert_eq!(reconstruct_page(&[frag("   ", 1.0, 1.0)], 3.0), "");
    }

    #[test]
    fn test_orders_top_to_bottom_then_left_to_right() {
        let page = vec![
            frag("1,474.70", 400.0, 680.0),
            frag("03 Dec", 20.0, 680.5),
            frag("Balance", 400.0, 700.0),
            frag("Date", 20.0, 700.0),
            frag("NETS Debit", 80.0, 679.0),
        ];
        assert_eq!(
            reconstruct_page(&page, 3.0),
            "Date Balance 03 Dec NETS Debit 1,474.70"
        );
    }

    #[test]
    fn test_tolerance_band_separates_lines() {
        let page = vec![frag("B", 10.0, 100.0), frag("A", 50.0, 104.0)];
        // 4 units apart: two lines, higher one first
        assert_eq!(reconstruct_page(&page, 3.0), "A B");
        // within tolerance: same line, x order
        assert_eq!(reconstruct_page(&page, 5.0), "B A");
    }

    #[test]
    fn test_document_keeps_page_order() {
        let doc = FragmentDocument {
            pages: vec![vec![frag("one", 0.0, 0.0)], vec![], vec![frag("three", 0.0, 0.0)]],
        };
        assert_eq!(reconstruct_document(&doc, 3.0), vec!["one", "", "three"]);
    }
}
