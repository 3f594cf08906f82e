use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use penny_classify::{ClassifierConfig, EmbeddingConfig, PropagationConfig, StorageConfig};
use penny_ingest::{LayoutConfig, ParserConfig};

use crate::state::ensure_penny_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub parser: ParserConfig,
    pub classifier: ClassifierConfig,
    pub propagation: PropagationConfig,
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_penny_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

/// Print the effective configuration (file merged over defaults).
pub fn show_config() -> Result<()> {
    let p = config_path()?;
    let cfg = load_config()?;
    let source = if p.exists() { p.display().to_string() } else { "defaults".to_string() };
    println!("# {source}");
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use penny_classify::EmbeddingBackend;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = parse_config(
            r#"
[classifier]
confidence_threshold = 0.7

[embedding]
backend = "http"
model = "all-minilm"
"#,
        )
        .unwrap();
        assert_eq!(cfg.classifier.confidence_threshold, 0.7);
        assert_eq!(cfg.classifier.batch_size, ClassifierConfig::default().batch_size);
        assert_eq!(cfg.embedding.backend, EmbeddingBackend::Http);
        assert_eq!(cfg.embedding.model, "all-minilm");
        assert_eq!(cfg.embedding.dims, 256);
        assert_eq!(cfg.propagation.similarity_threshold, 0.85);
        assert_eq!(cfg.parser.min_confidence, 0.5);
        assert!(!cfg.storage.in_memory);
    }

    #[test]
    fn test_empty_file_is_default() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.layout.line_tolerance, 3.0);
        assert_eq!(cfg.embedding.backend, EmbeddingBackend::Onnx);
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back = parse_config(&s).unwrap();
        assert_eq!(back.propagation.batch_budget_ms, 50);
        assert_eq!(back.classifier.correction_boost, 0.25);
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        assert!(parse_config("[embedding]\nbackend = \"gpu\"\n").is_err());
    }
}
