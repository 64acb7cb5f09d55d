//! Per-run import statistics, built by folding file outcomes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use bankfusion_core::BankCode;

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ImportOutcome {
    Inserted { bank: BankCode, collection: String },
    Duplicate { bank: BankCode, collection: String },
    /// `bank` is `None` when the file could not be read or parsed, which
    /// counts as unparseable rather than as an error
    Failed { bank: Option<BankCode>, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub file: String,
    pub error: String,
}

/// Summary of an import run.
///
/// Every scanned file lands in exactly one of `inserted`, `duplicates`,
/// `errors` or `unparseable`. Unparseable files are excluded before grouping
/// but still listed in `error_details`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRunStats {
    pub total: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: usize,
    pub unparseable: usize,
    pub by_bank: BTreeMap<BankCode, usize>,
    pub error_details: Vec<ErrorDetail>,
}

impl ImportRunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, file: &str, outcome: &ImportOutcome) -> Self {
        self.total += 1;
        match outcome {
            ImportOutcome::Inserted { bank, .. } => {
                self.inserted += 1;
                *self.by_bank.entry(*bank).or_insert(0) += 1;
            }
            ImportOutcome::Duplicate { .. } => self.duplicates += 1,
            ImportOutcome::Failed { bank, message } => {
                match bank {
                    Some(_) => self.errors += 1,
                    None => self.unparseable += 1,
                }
                self.error_details.push(ErrorDetail {
                    file: file.to_string(),
                    error: message.clone(),
                });
            }
        }
        self
    }

    pub fn merge(mut self, other: ImportRunStats) -> Self {
        self.total += other.total;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.errors += other.errors;
        self.unparseable += other.unparseable;
        for (bank, n) in other.by_bank {
            *self.by_bank.entry(bank).or_insert(0) += n;
        }
        self.error_details.extend(other.error_details);
        self
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.inserted + self.duplicates + self.errors + self.unparseable
            && self.by_bank.values().sum::<usize>() == self.inserted
            && self.error_details.len() == self.errors + self.unparseable
    }
}

impl fmt::Display for ImportRunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Import summary")?;
        writeln!(f, "  Total files:  {}", self.total)?;
        writeln!(f, "  Inserted:     {}", self.inserted)?;
        writeln!(f, "  Duplicates:   {}", self.duplicates)?;
        writeln!(f, "  Errors:       {}", self.errors)?;
        if self.unparseable > 0 {
            writeln!(f, "  Unparseable:  {}", self.unparseable)?;
        }
        if !self.by_bank.is_empty() {
            writeln!(f, "  By bank:")?;
            for (bank, n) in &self.by_bank {
                writeln!(f, "    {:<8} {}", bank.short_code(), n)?;
            }
        }
        for d in &self.error_details {
            writeln!(f, "  ! {}: {}", d.file, d.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inserted(bank: BankCode) -> ImportOutcome {
        ImportOutcome::Inserted {
            bank,
            collection: bank.collection().to_string(),
        }
    }

    #[test]
    fn test_record_counts_each_outcome_once() {
        let stats = ImportRunStats::new()
            .record("a.json", &inserted(BankCode::Hdfc))
            .record("b.json", &inserted(BankCode::Hdfc))
            .record(
                "c.json",
                &ImportOutcome::Duplicate {
                    bank: BankCode::Sbi,
                    collection: "sbi_statements".into(),
                },
            )
            .record(
                "d.json",
                &ImportOutcome::Failed {
                    bank: None,
                    message: "expected value at line 1".into(),
                },
            );

        assert_eq!(stats.total, 4);
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.unparseable, 1);
        assert_eq!(stats.by_bank.get(&BankCode::Hdfc), Some(&2));
        assert_eq!(stats.error_details[0].file, "d.json");
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_store_failure_is_an_error_not_unparseable() {
        let stats = ImportRunStats::new().record(
            "a.json",
            &ImportOutcome::Failed {
                bank: Some(BankCode::Union),
                message: "disk full".into(),
            },
        );
        assert_eq!((stats.errors, stats.unparseable), (1, 0));
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_merge() {
        let a = ImportRunStats::new().record("a.json", &inserted(BankCode::Axis));
        let b = ImportRunStats::new().record("b.json", &inserted(BankCode::Axis));
        let merged = a.merge(b);
        assert_eq!(merged.total, 2);
        assert_eq!(merged.by_bank.get(&BankCode::Axis), Some(&2));
        assert!(merged.is_consistent());
    }

    #[test]
    fn test_serializes_camel_case() {
        let stats = ImportRunStats::new().record("a.json", &inserted(BankCode::Boi));
        let v = serde_json::to_value(&stats).unwrap();
        assert_eq!(v["byBank"]["BOI"], 1);
        assert!(v["errorDetails"].as_array().unwrap().is_empty());
    }
}
