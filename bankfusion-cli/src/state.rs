use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$BANKFUSION_HOME`, or `~/.bankfusion`
pub fn bankfusion_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("BANKFUSION_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".bankfusion"))
}

pub fn ensure_bankfusion_home() -> Result<PathBuf> {
    let dir = bankfusion_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Expand a leading `~/` to `$HOME`
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").context("HOME is not set")?;
            Ok(PathBuf::from(home).join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(ensure_bankfusion_home()?.join("bankfusion.db"))
}
