//! Bank detection from file names and statement content.
//!
//! Filename fragments are checked first, in [`BANKS`] priority order; the
//! content's bank-name field is only consulted when the filename says
//! nothing.

use serde_json::Value;

use bankfusion_core::{BankCode, BANKS};

use crate::aliases::{lookup, Field};

/// Fragments shared by several institution names ("Central Bank of India",
/// "State Bank of India"). Only tried after every specific fragment missed.
const GENERIC_CONTENT_TOKENS: &[(&str, BankCode)] = &[("BANK OF INDIA", BankCode::Boi)];

/// Classify a statement. Never fails; unmatched input is `Unknown`.
pub fn classify(filename: &str, raw: Option<&Value>) -> BankCode {
    let name = filename.to_uppercase();
    if let Some(profile) = BANKS
        .iter()
        .find(|p| p.filename_tokens.iter().any(|t| name.contains(t)))
    {
        return profile.code;
    }

    raw.and_then(declared_bank_name)
        .map(|declared| classify_bank_name(&declared))
        .unwrap_or(BankCode::Unknown)
}

/// Classify a free-text institution name such as `"HDFC Bank Ltd"`.
pub fn classify_bank_name(declared: &str) -> BankCode {
    let declared = declared.to_uppercase();
    BANKS
        .iter()
        .find(|p| p.content_tokens.iter().any(|t| declared.contains(t)))
        .map(|p| p.code)
        .or_else(|| {
            GENERIC_CONTENT_TOKENS
                .iter()
                .find(|(t, _)| declared.contains(t))
                .map(|(_, code)| *code)
        })
        .unwrap_or(BankCode::Unknown)
}

fn declared_bank_name(raw: &Value) -> Option<String> {
    lookup(raw, Field::BankName)
        .and_then(Value::as_str)
        .map(str::to_string)
}
