//! Storage contract the import pipeline needs, plus two backends.
//!
//! Collections and indexes follow document-store semantics: inserting into
//! a missing collection creates it, and uniqueness is only enforced once a
//! unique index has been ensured.

pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;

use bankfusion_core::NormalizedStatement;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate statement {account_number} @ {statement_date} in {collection}")]
    Duplicate {
        collection: String,
        account_number: String,
        statement_date: String,
    },
    /// Connectivity loss. Fatal for an import run.
    #[error("store unavailable during {operation}: {message}")]
    Unavailable { operation: String, message: String },
    #[error("{operation} failed: {message}")]
    Backend { operation: String, message: String },
    #[error("document serialization: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }

    pub(crate) fn backend(operation: impl Into<String>, message: impl ToString) -> Self {
        StoreError::Backend {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    /// Document field path, e.g. `statementDate` or `transactions.date`
    pub field: String,
    pub direction: IndexDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<IndexKey>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, keys: &[(&str, IndexDirection)]) -> Self {
        Self {
            name: name.into(),
            keys: keys
                .iter()
                .map(|(field, direction)| IndexKey {
                    field: field.to_string(),
                    direction: *direction,
                })
                .collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertResult {
    pub collection: String,
    /// Backend-assigned document id
    pub id: String,
}

/// Statement-level predicates supported by [`StatementStore::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub account_number: Option<String>,
    /// Case-insensitive substring of `bankName`
    pub bank_name_contains: Option<String>,
    /// Case-insensitive substring of `accountHolder`
    pub account_holder_contains: Option<String>,
    /// Inclusive lower bound on `statementDate`
    pub statement_date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `statementDate`
    pub statement_date_to: Option<DateTime<Utc>>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn account(account_number: impl Into<String>) -> Self {
        Self {
            account_number: Some(account_number.into()),
            ..Self::default()
        }
    }

    pub fn bank(fragment: impl Into<String>) -> Self {
        Self {
            bank_name_contains: Some(fragment.into()),
            ..Self::default()
        }
    }

    pub fn date_range(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            statement_date_from: Some(from),
            statement_date_to: Some(to),
            ..Self::default()
        }
    }

    pub fn matches(&self, doc: &NormalizedStatement) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_ref()
                .is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };

        self.account_number
            .as_ref()
            .is_none_or(|a| *a == doc.account_number)
            && contains(&doc.bank_name, &self.bank_name_contains)
            && contains(&doc.account_holder, &self.account_holder_contains)
            && self.statement_date_from.is_none_or(|from| doc.statement_date >= from)
            && self.statement_date_to.is_none_or(|to| doc.statement_date <= to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    StatementDateAsc,
    StatementDateDesc,
}

/// Document storage used by the import coordinator and reports.
pub trait StatementStore {
    /// Idempotent collection creation
    fn ensure_collection(&mut self, name: &str) -> Result<(), StoreError>;

    /// Idempotent index creation; an existing index with the same name and a
    /// different definition is replaced.
    fn ensure_index(&mut self, collection: &str, index: &IndexSpec) -> Result<(), StoreError>;

    fn ensure_unique_index(
        &mut self,
        collection: &str,
        name: &str,
        fields: &[&str],
    ) -> Result<(), StoreError> {
        let keys: Vec<_> = fields
            .iter()
            .map(|f| (*f, IndexDirection::Ascending))
            .collect();
        self.ensure_index(collection, &IndexSpec::new(name, &keys).unique())
    }

    /// Insert one document. A unique-index violation is `StoreError::Duplicate`.
    fn insert_one(
        &mut self,
        collection: &str,
        doc: &NormalizedStatement,
    ) -> Result<InsertResult, StoreError>;

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<NormalizedStatement>, StoreError>;

    /// Names of all known collections, sorted
    fn collections(&self) -> Result<Vec<String>, StoreError>;

    /// Index names currently defined on a collection
    fn indexes(&self, collection: &str) -> Result<Vec<String>, StoreError>;

    fn drop_indexes(&mut self, collection: &str) -> Result<(), StoreError>;

    /// Delete every document in a collection, returning how many were removed
    fn clear(&mut self, collection: &str) -> Result<usize, StoreError>;
}

pub(crate) fn sort_documents(docs: &mut [NormalizedStatement], sort: Option<Sort>) {
    match sort {
        Some(Sort::StatementDateAsc) => docs.sort_by_key(|d| d.statement_date),
        Some(Sort::StatementDateDesc) => {
            docs.sort_by(|a, b| b.statement_date.cmp(&a.statement_date))
        }
        None => {}
    }
}
