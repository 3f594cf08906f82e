use penny_classify::{BulkSummary, Candidate};
use penny_core::{CategorySource, Statement, Transaction};
use std::path::Path;

const DESC_WIDTH: usize = 38;

fn source_tag(source: CategorySource) -> &'static str {
    match source {
        CategorySource::Rule => "rule",
        CategorySource::Embedding => "embed",
        CategorySource::User => "user",
    }
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

pub fn transaction_row(t: &Transaction) -> String {
    let hidden = if t.hidden { " (hidden)" } else { "" };
    format!(
        "{:<28} {} {:<width$} {:>11.2} {:<20} {}{}",
        t.id,
        t.date.format("%Y-%m-%d"),
        clip(&t.description, DESC_WIDTH),
        t.amount,
        t.category.label(),
        source_tag(t.category_source),
        hidden,
        width = DESC_WIDTH,
    )
}

pub fn print_statement(path: &Path, s: &Statement) {
    println!("{} [{}] {}", path.display(), s.parser_id, s.kind.as_str());
    println!(
        "Period {} to {} | {} transactions ({} visible)\n",
        s.period.start,
        s.period.end,
        s.transactions.len(),
        s.visible().count()
    );
    for t in &s.transactions {
        println!("{}", transaction_row(t));
    }

    let (inflow, outflow) = totals(s);
    println!("\nIn ${:.2} | Out ${:.2}\n", inflow, outflow);
}

/// Money in and money out over visible transactions, both positive.
pub fn totals(s: &Statement) -> (f64, f64) {
    let inflow: f64 = s.visible().filter(|t| t.is_inflow()).map(|t| t.amount).sum();
    let outflow: f64 = s.visible().filter(|t| t.is_outflow()).map(|t| t.amount).sum();
    (inflow, outflow.abs())
}

pub fn print_summary(summary: &BulkSummary) {
    println!(
        "Embedding pass: examined={} updated={} skipped={}\n",
        summary.examined, summary.updated, summary.skipped
    );
}

pub fn print_candidates(txns: &[Transaction], candidates: &[Candidate]) {
    if candidates.is_empty() {
        println!("No similar transactions found.");
        return;
    }
    println!("Similar transactions ({}):", candidates.len());
    for c in candidates {
        let desc = txns.get(c.index).map(|t| t.description.as_str()).unwrap_or("");
        println!(
            "- {:<28} sim={:.3} | {} | currently {}",
            c.id,
            c.similarity,
            clip(desc, DESC_WIDTH),
            c.current.label()
        );
    }
}
