//! bankfusion-ingest: bank classification and normalization of extracted statement JSON.

pub mod aliases;
pub mod bank_rules;
pub mod classifier;
pub mod coerce;
pub mod holder;
pub mod normalizer;
pub mod types;

pub use classifier::{classify, classify_bank_name};
pub use normalizer::Normalizer;
pub use types::{NormalizeOptions, parse_raw_statement, read_raw_statement};
