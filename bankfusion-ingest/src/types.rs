use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use bankfusion_core::statement::DEFAULT_CURRENCY;

/// Normalization policy knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Drop entries with a zero amount and no description (extractor filler rows)
    pub drop_placeholder_transactions: bool,
    /// Currency used when the statement does not declare one
    pub default_currency: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            drop_placeholder_transactions: false,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Read a raw statement file. The top level must be a JSON object.
pub fn read_raw_statement(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_raw_statement(&content).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_raw_statement(content: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(content)?;
    if !value.is_object() {
        bail!("expected a JSON object at the top level");
    }
    Ok(value)
}
