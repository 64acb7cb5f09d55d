//! Supported issuing banks and their static routing attributes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bank that produced a statement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BankCode {
    #[serde(rename = "AXIS")]
    Axis,
    #[serde(rename = "BOI")]
    Boi,
    #[serde(rename = "HDFC")]
    Hdfc,
    #[serde(rename = "Central")]
    Central,
    #[serde(rename = "Union")]
    Union,
    #[serde(rename = "SBI")]
    Sbi,
    #[serde(rename = "Unknown")]
    Unknown,
}

/// Static attributes for one bank. Declared once in [`BANKS`].
#[derive(Debug, Clone, Copy)]
pub struct BankProfile {
    pub code: BankCode,
    pub short: &'static str,
    pub display_name: &'static str,
    pub collection: &'static str,
    /// Uppercase fragments matched against file names
    pub filename_tokens: &'static [&'static str],
    /// Uppercase fragments matched against a bank-name field in the content
    pub content_tokens: &'static [&'static str],
}

/// Known banks in classification priority order.
pub const BANKS: &[BankProfile] = &[
    BankProfile {
        code: BankCode::Axis,
        short: "AXIS",
        display_name: "AXIS Bank",
        collection: "axis_bank_statements",
        filename_tokens: &["AXIS"],
        content_tokens: &["AXIS"],
    },
    BankProfile {
        code: BankCode::Boi,
        short: "BOI",
        display_name: "Bank of India",
        collection: "boi_statements",
        filename_tokens: &["BOI"],
        content_tokens: &["BOI"],
    },
    BankProfile {
        code: BankCode::Hdfc,
        short: "HDFC",
        display_name: "HDFC Bank",
        collection: "hdfc_statements",
        filename_tokens: &["HDFC"],
        content_tokens: &["HDFC"],
    },
    BankProfile {
        code: BankCode::Central,
        short: "Central",
        display_name: "Central Bank of India",
        collection: "central_bank_statements",
        filename_tokens: &["CENTRAL"],
        content_tokens: &["CENTRAL"],
    },
    BankProfile {
        code: BankCode::Union,
        short: "Union",
        display_name: "Union Bank of India",
        collection: "union_bank_statements",
        filename_tokens: &["UNION"],
        content_tokens: &["UNION"],
    },
    BankProfile {
        code: BankCode::Sbi,
        short: "SBI",
        display_name: "State Bank of India",
        collection: "sbi_statements",
        filename_tokens: &["SBI"],
        content_tokens: &["SBI", "STATE BANK"],
    },
];

static UNKNOWN: BankProfile = BankProfile {
    code: BankCode::Unknown,
    short: "Unknown",
    display_name: "Unknown Bank",
    collection: "unknown_bank_statements",
    filename_tokens: &[],
    content_tokens: &[],
};

impl BankCode {
    /// Static profile for this bank
    pub fn profile(&self) -> &'static BankProfile {
        BANKS
            .iter()
            .find(|p| p.code == *self)
            .unwrap_or(&UNKNOWN)
    }

    pub fn short_code(&self) -> &'static str {
        self.profile().short
    }

    pub fn display_name(&self) -> &'static str {
        self.profile().display_name
    }

    /// Per-bank collection the statement is routed to
    pub fn collection(&self) -> &'static str {
        self.profile().collection
    }

    /// Every code including `Unknown`
    pub fn all() -> impl Iterator<Item = BankCode> {
        BANKS.iter().map(|p| p.code).chain(std::iter::once(BankCode::Unknown))
    }
}

impl fmt::Display for BankCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_code())
    }
}

impl FromStr for BankCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        BankCode::all()
            .find(|c| c.short_code().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown bank code: {s}"))
    }
}
