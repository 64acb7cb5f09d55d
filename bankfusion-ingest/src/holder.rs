//! Account holder name cleanup.
//!
//! Extractors often glue the interest-rate box onto the holder line:
//!   Mr. RAHUL SHARMA Interest Rate(% p.a.) 3.25

use anyhow::Result;
use regex::Regex;

use bankfusion_core::statement::UNKNOWN_HOLDER;

use crate::coerce::collapse_whitespace;

#[derive(Debug, Clone)]
pub struct HolderCleaner {
    interest_suffix: Regex,
    trailing_number: Regex,
    honorific: Regex,
    filename_name: Regex,
}

impl HolderCleaner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            interest_suffix: Regex::new(r"(?is)interest\s+rate.*$")?,
            trailing_number: Regex::new(r"[\d.]+\s*$")?,
            honorific: Regex::new(r"(?i)^(?:mr\.|mrs\.|miss\.)\s+")?,
            filename_name: Regex::new(r"Statement_([A-Z_]+)_")?,
        })
    }

    /// Strip boilerplate from a declared holder; `None` if nothing is left.
    pub fn clean(&self, declared: &str) -> Option<String> {
        let s = self.interest_suffix.replace(declared, "");
        let s = self.trailing_number.replace(s.trim(), "");
        let s = self.honorific.replace(s.trim(), "");
        let s = collapse_whitespace(&s);
        (!s.is_empty()).then_some(s)
    }

    /// Holder encoded in a `Statement_<NAME_WITH_UNDERSCORES>_...` file name
    pub fn from_filename(&self, filename: &str) -> Option<String> {
        let caps = self.filename_name.captures(filename)?;
        let name = collapse_whitespace(&caps[1].replace('_', " "));
        (!name.is_empty()).then_some(name)
    }

    /// Declared holder, else filename holder, else `"Unknown"`.
    pub fn resolve(&self, declared: Option<&str>, filename: &str) -> String {
        declared
            .and_then(|d| self.clean(d))
            .or_else(|| self.from_filename(filename))
            .unwrap_or_else(|| UNKNOWN_HOLDER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> HolderCleaner {
        HolderCleaner::new().unwrap()
    }

    #[test]
    fn test_strips_interest_rate_and_honorific() {
        assert_eq!(
            cleaner().resolve(Some("Mr. RAHUL SHARMA Interest Rate(% p.a.) 3.25"), "x.json"),
            "RAHUL SHARMA"
        );
        assert_eq!(cleaner().resolve(Some("MRS. ANITA  DESAI"), "x.json"), "ANITA DESAI");
    }

    #[test]
    fn test_strips_trailing_numeric_noise() {
        assert_eq!(cleaner().resolve(Some("Miss. KAVYA IYER 4.00"), "x.json"), "KAVYA IYER");
    }

    #[test]
    fn test_filename_fallback() {
        assert_eq!(
            cleaner().resolve(None, "Statement_PRIYA_MEHTA_00231.json"),
            "PRIYA MEHTA"
        );
        assert_eq!(
            cleaner().resolve(Some("Interest Rate 3.5"), "BOI_Statement_ARJUN_NAIR_12.json"),
            "ARJUN NAIR"
        );
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(cleaner().resolve(Some("   "), "AXIS_Statement_2024.json"), "Unknown");
        assert_eq!(cleaner().resolve(None, "statement.json"), "Unknown");
    }
}
