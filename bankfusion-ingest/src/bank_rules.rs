//! Bank-specific narration cleanup.
//!
//! AXIS and Central Bank extracts leave amount and balance tokens inside
//! the narration, e.g.:
//!   TO TRF. RENT MARCH 1,813.63 335,281.72Cr

use anyhow::Result;
use regex::Regex;

use bankfusion_core::BankCode;

use crate::coerce::collapse_whitespace;

#[derive(Debug, Clone)]
pub struct DescriptionCleaner {
    inline_amount: Regex,
}

impl DescriptionCleaner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            inline_amount: Regex::new(r"(?i)\b\d[\d,]*\.\d{2}(?:cr|dr)?\b")?,
        })
    }

    /// Cleaned narration; empty when nothing meaningful remains.
    pub fn clean(&self, bank: BankCode, raw: &str) -> String {
        let text = collapse_whitespace(raw);
        match bank {
            BankCode::Axis | BankCode::Central => {
                collapse_whitespace(&self.inline_amount.replace_all(&text, ""))
            }
            _ => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_inline_amounts_for_axis_and_central() {
        let c = DescriptionCleaner::new().unwrap();
        assert_eq!(
            c.clean(BankCode::Central, "TO TRF. RENT MARCH 1,813.63 335,281.72Cr"),
            "TO TRF. RENT MARCH"
        );
        assert_eq!(c.clean(BankCode::Axis, "BY TRF SALARY  62,541.51Cr"), "BY TRF SALARY");
    }

    #[test]
    fn test_other_banks_only_collapse_whitespace() {
        let c = DescriptionCleaner::new().unwrap();
        assert_eq!(c.clean(BankCode::Hdfc, "UPI  PAY 1,813.63"), "UPI PAY 1,813.63");
    }

    #[test]
    fn test_amount_only_narration_becomes_empty() {
        let c = DescriptionCleaner::new().unwrap();
        assert_eq!(c.clean(BankCode::Axis, "268.65"), "");
    }
}
