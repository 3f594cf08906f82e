//! Raw statement file → page texts.
//!
//! - `.pdf`: pdf-extract text layer, pages split on form feed
//! - `.json`: a [`FragmentDocument`] of positioned fragments, linearized by the layout pass
//! - anything else: UTF-8 text, pages split on form feed

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::LayoutConfig;
use crate::layout::reconstruct_document;
use crate::types::FragmentDocument;

const FORM_FEED: char = '\u{c}';

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_pages(text: &str) -> Vec<String> {
    text.split(FORM_FEED).map(normalize_whitespace).collect()
}

/// Extract page texts from in-memory bytes. `hint` is the file name or extension.
pub fn extract_pages_from_bytes(bytes: &[u8], hint: &str, layout: &LayoutConfig) -> Result<Vec<String>> {
    let lower = hint.to_ascii_lowercase();
    let pages = if lower.ends_with("pdf") {
        let text = pdf_extract::extract_text_from_mem(bytes).context("extract PDF text layer")?;
        split_pages(&text)
    } else if lower.ends_with("json") {
        let doc: FragmentDocument = serde_json::from_slice(bytes).context("parse fragment document")?;
        reconstruct_document(&doc, layout.line_tolerance)
    } else {
        split_pages(&String::from_utf8_lossy(bytes))
    };

    // pdf-extract leaves a trailing form feed; drop empty tail pages.
    let mut pages = pages;
    while pages.last().is_some_and(|p| p.is_empty()) && pages.len() > 1 {
        pages.pop();
    }
    debug!(pages = pages.len(), hint, "extracted pages");
    Ok(pages)
}

/// Extract page texts from a file on disk.
pub fn extract_pages(path: &Path, layout: &LayoutConfig) -> Result<Vec<String>> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let hint = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    extract_pages_from_bytes(&bytes, hint, layout).with_context(|| format!("extract {}", path.display()))
}

/// Fan out extraction over several files. Results keep the input order.
pub async fn extract_many(paths: Vec<PathBuf>, layout: LayoutConfig) -> Vec<(PathBuf, Result<Vec<String>>)> {
    let handles: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let layout = layout.clone();
            let p = path.clone();
            (path, tokio::task::spawn_blocking(move || extract_pages(&p, &layout)))
        })
        .collect();

    let mut out = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let res = match handle.await {
            Ok(r) => r,
            Err(e) => Err(anyhow::anyhow!("extraction task failed: {e}")),
        };
        out.push((path, res));
    }
    info!(files = out.len(), "extraction finished");
    out
}
