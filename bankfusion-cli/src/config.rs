use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use bankfusion_import::ImportSettings;
use bankfusion_ingest::NormalizeOptions;

use crate::state::{default_db_path, ensure_bankfusion_home, expand_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreSection,
    pub import: ImportSettings,
    pub normalize: NormalizeOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    /// Process-local; nothing survives the command
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: Backend,
    /// SQLite database file. Defaults to `bankfusion.db` in the home directory.
    pub path: Option<String>,
}

impl StoreSection {
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(p) => expand_home(p),
            None => default_db_path(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_bankfusion_home()?.join("bankfusion.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
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

#[cfg(test)]
mod tests {
    use super::*;
    use bankfusion_import::Layout;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg = parse_config(
            r#"
            [import]
            layout = "unified"

            [normalize]
            drop_placeholder_transactions = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.store.backend, Backend::Sqlite);
        assert_eq!(cfg.import.layout, Layout::Unified);
        assert_eq!(cfg.import.extension, "json");
        assert_eq!(cfg.import.unified_collection, "bank_statements");
        assert!(cfg.normalize.drop_placeholder_transactions);
        assert_eq!(cfg.normalize.default_currency, "INR");
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(parse_config(&s).unwrap(), cfg);
    }

    #[test]
    fn test_explicit_db_path() {
        let store = StoreSection {
            backend: Backend::Sqlite,
            path: Some("/tmp/statements.db".into()),
        };
        assert_eq!(store.db_path().unwrap(), PathBuf::from("/tmp/statements.db"));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(parse_config("[store]\nbackend = \"mongo\"").is_err());
    }
}
