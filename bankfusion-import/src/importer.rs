//! Import coordinator: scan a directory, group files by bank, make sure each
//! target collection has its indexes, then normalize and insert one file at
//! a time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use bankfusion_core::BankCode;
use bankfusion_ingest::{classify, read_raw_statement, Normalizer};

use crate::stats::{ImportOutcome, ImportRunStats};
use crate::store::{IndexDirection, IndexSpec, StatementStore, StoreError};

pub const UNIFIED_COLLECTION: &str = "bank_statements";

/// Collection layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// One collection per bank (`hdfc_statements`, ...)
    #[default]
    PerBank,
    /// Every bank in a single collection
    Unified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// File extension to pick up, without the dot
    pub extension: String,
    pub layout: Layout,
    pub unified_collection: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            layout: Layout::PerBank,
            unified_collection: UNIFIED_COLLECTION.to_string(),
        }
    }
}

impl ImportSettings {
    pub fn collection_for(&self, bank: BankCode) -> String {
        match self.layout {
            Layout::PerBank => bank.collection().to_string(),
            Layout::Unified => self.unified_collection.clone(),
        }
    }

    /// Every collection this layout can write to
    pub fn collections(&self) -> Vec<String> {
        match self.layout {
            Layout::PerBank => BankCode::all().map(|b| b.collection().to_string()).collect(),
            Layout::Unified => vec![self.unified_collection.clone()],
        }
    }

    /// Create `collection` and its indexes in `store`.
    pub fn prepare_collection<S: StatementStore + ?Sized>(
        &self,
        store: &mut S,
        collection: &str,
    ) -> Result<(), ImportError> {
        let schema_err = |source| ImportError::Schema {
            collection: collection.to_string(),
            source,
        };

        store.ensure_collection(collection).map_err(schema_err)?;
        for index in self.schema_indexes() {
            store.ensure_index(collection, &index).map_err(schema_err)?;
        }
        debug!(collection, "schema ready");
        Ok(())
    }

    /// Indexes ensured on every target collection before inserting
    pub fn schema_indexes(&self) -> Vec<IndexSpec> {
        use IndexDirection::{Ascending, Descending};

        let mut indexes = vec![
            IndexSpec::new(
                "unique_statement_idx",
                &[("accountNumber", Ascending), ("statementDate", Ascending)],
            )
            .unique(),
            IndexSpec::new("account_holder_idx", &[("accountHolder", Ascending)]),
            IndexSpec::new("date_idx", &[("statementDate", Descending)]),
            IndexSpec::new("transaction_date_idx", &[("transactions.date", Ascending)]),
        ];
        if self.layout == Layout::Unified {
            indexes.push(IndexSpec::new(
                "bank_date_idx",
                &[("bankName", Ascending), ("statementDate", Descending)],
            ));
        }
        indexes
    }
}

/// Errors that end a run. Per-file problems are reported through
/// [`ImportOutcome::Failed`] instead.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("schema setup for {collection} failed: {source}")]
    Schema {
        collection: String,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct ParsedFile {
    name: String,
    raw: Value,
}

pub struct Importer<'a, S: StatementStore + ?Sized> {
    store: &'a mut S,
    normalizer: Normalizer,
    settings: ImportSettings,
    prepared: HashSet<String>,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl<'a, S: StatementStore + ?Sized> Importer<'a, S> {
    pub fn new(store: &'a mut S, normalizer: Normalizer, settings: ImportSettings) -> Self {
        Self {
            store,
            normalizer,
            settings,
            prepared: HashSet::new(),
        }
    }

    /// Statement files in `dir`, sorted by file name
    pub fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
        let scan_err = |source| ImportError::Scan {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(scan_err)? {
            let path = entry.map_err(scan_err)?.path();
            let matches = path
                .extension()
                .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(&self.settings.extension));
            if path.is_file() && matches {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    pub fn import_directory(&mut self, dir: &Path) -> Result<ImportRunStats, ImportError> {
        let files = self.scan(dir)?;
        info!(dir = %dir.display(), files = files.len(), "scanned import directory");

        let mut stats = ImportRunStats::new();
        if files.is_empty() {
            return Ok(stats);
        }

        // Group by bank, keeping first-encounter order of banks and files
        let mut groups: Vec<(BankCode, Vec<ParsedFile>)> = Vec::new();
        for path in &files {
            let name = display_name(path);
            let raw = match read_raw_statement(path) {
                Ok(raw) => raw,
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(file = %name, error = %message, "skipping unreadable file");
                    stats = stats.record(&name, &ImportOutcome::Failed { bank: None, message });
                    continue;
                }
            };
            let bank = classify(&name, Some(&raw));
            debug!(file = %name, bank = %bank, "classified");
            let parsed = ParsedFile { name, raw };
            match groups.iter_mut().find(|(b, _)| *b == bank) {
                Some((_, group)) => group.push(parsed),
                None => groups.push((bank, vec![parsed])),
            }
        }

        for (bank, group) in &groups {
            info!(bank = %bank, files = group.len(), "bank group");
            let collection = self.settings.collection_for(*bank);
            self.ensure_schema(&collection)?;
        }

        for (bank, group) in groups {
            for file in group {
                let outcome = self.store_one(&file.raw, &file.name, bank)?;
                stats = stats.record(&file.name, &outcome);
            }
        }

        info!(
            total = stats.total,
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            errors = stats.errors,
            unparseable = stats.unparseable,
            "import finished"
        );
        Ok(stats)
    }

    /// Import a single statement file
    pub fn import_file(&mut self, path: &Path) -> Result<ImportOutcome, ImportError> {
        let name = display_name(path);
        let raw = match read_raw_statement(path) {
            Ok(raw) => raw,
            Err(e) => {
                let message = format!("{e:#}");
                warn!(file = %name, error = %message, "unreadable file");
                return Ok(ImportOutcome::Failed { bank: None, message });
            }
        };
        let bank = classify(&name, Some(&raw));
        let collection = self.settings.collection_for(bank);
        self.ensure_schema(&collection)?;
        self.store_one(&raw, &name, bank)
    }

    /// Create `collection` and its indexes once per importer
    pub fn ensure_schema(&mut self, collection: &str) -> Result<(), ImportError> {
        if self.prepared.contains(collection) {
            return Ok(());
        }
        self.settings
            .prepare_collection(&mut *self.store, collection)?;
        self.prepared.insert(collection.to_string());
        Ok(())
    }

    fn store_one(
        &mut self,
        raw: &Value,
        name: &str,
        bank: BankCode,
    ) -> Result<ImportOutcome, ImportError> {
        let doc = self.normalizer.normalize(raw, name, bank);
        let collection = self.settings.collection_for(bank);

        match self.store.insert_one(&collection, &doc) {
            Ok(result) => {
                info!(
                    file = %name,
                    bank = %bank,
                    collection = %result.collection,
                    transactions = doc.transactions.len(),
                    "imported"
                );
                Ok(ImportOutcome::Inserted { bank, collection })
            }
            Err(e) if e.is_duplicate() => {
                warn!(file = %name, account = %doc.account_number, "duplicate statement, skipped");
                Ok(ImportOutcome::Duplicate { bank, collection })
            }
            Err(e) if e.is_fatal() => Err(ImportError::Store(e)),
            Err(e) => {
                warn!(file = %name, error = %e, "insert failed");
                Ok(ImportOutcome::Failed {
                    bank: Some(bank),
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_routing() {
        let per_bank = ImportSettings::default();
        assert_eq!(per_bank.collection_for(BankCode::Hdfc), "hdfc_statements");
        assert_eq!(per_bank.collection_for(BankCode::Unknown), "unknown_bank_statements");

        let unified = ImportSettings {
            layout: Layout::Unified,
            ..ImportSettings::default()
        };
        assert_eq!(unified.collection_for(BankCode::Hdfc), UNIFIED_COLLECTION);
    }

    #[test]
    fn test_schema_indexes() {
        let names = |s: &ImportSettings| {
            s.schema_indexes()
                .into_iter()
                .map(|i| i.name)
                .collect::<Vec<_>>()
        };
        let per_bank = ImportSettings::default();
        assert_eq!(
            names(&per_bank),
            vec!["unique_statement_idx", "account_holder_idx", "date_idx", "transaction_date_idx"]
        );
        assert!(per_bank.schema_indexes()[0].unique);

        let unified = ImportSettings {
            layout: Layout::Unified,
            ..ImportSettings::default()
        };
        assert!(names(&unified).contains(&"bank_date_idx".to_string()));
    }

    #[test]
    fn test_prepare_collection_without_importer() {
        let mut store = crate::MemoryStore::new();
        let settings = ImportSettings {
            layout: Layout::Unified,
            ..ImportSettings::default()
        };
        assert_eq!(settings.collections(), vec![UNIFIED_COLLECTION.to_string()]);

        settings.prepare_collection(&mut store, UNIFIED_COLLECTION).unwrap();
        settings.prepare_collection(&mut store, UNIFIED_COLLECTION).unwrap();
        let indexes = store.indexes(UNIFIED_COLLECTION).unwrap();
        assert_eq!(indexes.len(), 5);
        assert!(indexes.contains(&"bank_date_idx".to_string()));
        assert_eq!(store.count(UNIFIED_COLLECTION), 0);

        assert_eq!(ImportSettings::default().collections().len(), BankCode::all().count());
    }

    #[test]
    fn test_layout_from_toml_style_name() {
        let settings: ImportSettings =
            serde_json::from_value(serde_json::json!({"layout": "unified"})).unwrap();
        assert_eq!(settings.layout, Layout::Unified);
        assert_eq!(settings.extension, "json");
    }
}
