use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use penny_classify::{EmbeddingCache, apply_bulk_correction, classify_all, correct_and_propose};
use penny_core::Category;
use penny_ingest::ParserRegistry;

mod config;
mod pipeline;
mod report;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "penny",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PENNY_BUILD_SHA"), ")"),
    about = "Local bank statement parsing and categorization"
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the statement formats that can be parsed
    Formats,

    /// Extract and parse statements; categories come from the keyword rules
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Parse a statement, then run the embedding classifier over it
    Classify {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Correct one transaction's category and show similar transactions
    Correct {
        file: PathBuf,

        /// Transaction id as shown by `penny parse`
        #[arg(long)]
        id: String,

        /// Category label, e.g. "Food & Dining"
        #[arg(long)]
        category: Category,

        /// Give every similar transaction the same category
        #[arg(long)]
        apply: bool,
    },

    /// Inspect or purge the embedding cache and learned corrections
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Write or show ~/.penny/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    Stats,
    Clear,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Init,
    Show,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "penny=debug,penny_core=debug,penny_ingest=debug,penny_classify=debug"
    } else {
        "penny=info,penny_core=info,penny_ingest=info,penny_classify=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Formats => {
            let cfg = config::load_config()?;
            let registry = ParserRegistry::with_defaults(&cfg.parser).context("build parser registry")?;
            for name in registry.supported_formats() {
                println!("{name}");
            }
        }

        Command::Parse { files, json } => {
            let cfg = config::load_config()?;
            let statements = pipeline::load_statements(&cfg, files).await?;
            if json {
                let all: Vec<_> = statements.iter().map(|(_, s)| s).collect();
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                for (path, s) in &statements {
                    report::print_statement(path, s);
                }
            }
        }

        Command::Classify { file, json } => {
            let cfg = config::load_config()?;
            let mut statement = pipeline::load_statement(&cfg, file.clone()).await?;
            let mut classifier = pipeline::open_classifier(&cfg).await;
            let summary = classify_all(&mut classifier, &mut statement.transactions).await;
            classifier.cache().flush().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&statement)?);
            } else {
                report::print_summary(&summary);
                report::print_statement(&file, &statement);
            }
        }

        Command::Correct { file, id, category, apply } => {
            let cfg = config::load_config()?;
            let mut statement = pipeline::load_statement(&cfg, file.clone()).await?;
            let Some(target) = statement.transactions.iter().position(|t| t.id == id) else {
                bail!("no transaction {id} in {}", file.display());
            };

            let mut classifier = pipeline::open_classifier(&cfg).await;
            classify_all(&mut classifier, &mut statement.transactions).await;
            let candidates = correct_and_propose(
                &mut classifier,
                &mut statement.transactions,
                target,
                category,
                &cfg.propagation,
            )
            .await;

            println!("{id} -> {category}\n");
            report::print_candidates(&statement.transactions, &candidates);

            if apply && !candidates.is_empty() {
                let pairs: Vec<(String, Category)> = candidates.iter().map(|c| (c.id.clone(), category)).collect();
                let applied = apply_bulk_correction(&mut classifier, &mut statement.transactions, &pairs).await;
                println!("\nApplied {category} to {applied} more transaction(s)\n");
                report::print_statement(&file, &statement);
            } else if !candidates.is_empty() {
                println!("\nRe-run with --apply to recategorize them.");
            }
            classifier.cache().flush().await;
        }

        Command::Cache { command } => {
            let cfg = config::load_config()?;
            let mut cache = EmbeddingCache::load(state::open_store(&cfg.storage));
            match command {
                CacheCommand::Stats => {
                    if !cfg.storage.in_memory {
                        println!("Store: {}", state::cache_path(&cfg.storage)?.display());
                    }
                    println!("Vectors: {}", cache.len());
                    println!("Corrections: {}", cache.corrections().len());
                    for (desc, cat) in cache.corrections() {
                        println!("- {desc} -> {cat}");
                    }
                }
                CacheCommand::Clear => {
                    let (vectors, corrections) = (cache.len(), cache.corrections().len());
                    cache.clear();
                    println!("Cleared {vectors} vector(s) and {corrections} correction(s)");
                }
            }
            cache.flush().await;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },
    }

    Ok(())
}
