//! In-process store. Used by tests and the `memory` backend.

use serde_json::Value;
use std::collections::BTreeMap;

use bankfusion_core::NormalizedStatement;

use super::{sort_documents, Filter, IndexSpec, InsertResult, Sort, StatementStore, StoreError};

#[derive(Debug, Default)]
struct Collection {
    docs: Vec<NormalizedStatement>,
    indexes: Vec<IndexSpec>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection (0 if it does not exist)
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.docs.len())
            .unwrap_or(0)
    }
}

/// Values of the index's key fields in `doc`, as comparable strings.
fn index_key(index: &IndexSpec, doc: &NormalizedStatement) -> Result<Vec<String>, StoreError> {
    let value = serde_json::to_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(index
        .keys
        .iter()
        .map(|k| field_path(&value, &k.field).to_string())
        .collect())
}

fn field_path<'a>(value: &'a Value, path: &str) -> &'a Value {
    path.split('.')
        .try_fold(value, |v, part| v.get(part))
        .unwrap_or(&Value::Null)
}

fn duplicate(collection: &str, doc: &NormalizedStatement) -> StoreError {
    let (account_number, statement_date) = doc.natural_key();
    StoreError::Duplicate {
        collection: collection.to_string(),
        account_number,
        statement_date,
    }
}

impl StatementStore for MemoryStore {
    fn ensure_collection(&mut self, name: &str) -> Result<(), StoreError> {
        self.collections.entry(name.to_string()).or_default();
        Ok(())
    }

    fn ensure_index(&mut self, collection: &str, index: &IndexSpec) -> Result<(), StoreError> {
        let coll = self.collections.entry(collection.to_string()).or_default();
        if coll.indexes.iter().any(|i| i == index) {
            return Ok(());
        }

        if index.unique {
            let mut seen = std::collections::HashSet::new();
            for doc in &coll.docs {
                if !seen.insert(index_key(index, doc)?) {
                    return Err(StoreError::backend(
                        format!("create index {}", index.name),
                        "existing documents violate uniqueness",
                    ));
                }
            }
        }

        coll.indexes.retain(|i| i.name != index.name);
        coll.indexes.push(index.clone());
        Ok(())
    }

    fn insert_one(
        &mut self,
        collection: &str,
        doc: &NormalizedStatement,
    ) -> Result<InsertResult, StoreError> {
        let coll = self.collections.entry(collection.to_string()).or_default();

        for index in coll.indexes.iter().filter(|i| i.unique) {
            let key = index_key(index, doc)?;
            for existing in &coll.docs {
                if index_key(index, existing)? == key {
                    return Err(duplicate(collection, doc));
                }
            }
        }

        coll.docs.push(doc.clone());
        Ok(InsertResult {
            collection: collection.to_string(),
            id: coll.docs.len().to_string(),
        })
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<NormalizedStatement>, StoreError> {
        let mut docs: Vec<_> = self
            .collections
            .get(collection)
            .map(|c| c.docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        sort_documents(&mut docs, sort);
        if let Some(limit) = limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    fn collections(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.collections.keys().cloned().collect())
    }

    fn indexes(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .map(|c| c.indexes.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_default())
    }

    fn drop_indexes(&mut self, collection: &str) -> Result<(), StoreError> {
        if let Some(c) = self.collections.get_mut(collection) {
            c.indexes.clear();
        }
        Ok(())
    }

    fn clear(&mut self, collection: &str) -> Result<usize, StoreError> {
        Ok(self
            .collections
            .get_mut(collection)
            .map(|c| std::mem::take(&mut c.docs).len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::IndexDirection;
    use crate::test_support::statement;

    #[test]
    fn test_unique_index_rejects_second_insert() {
        let mut store = MemoryStore::new();
        store
            .ensure_unique_index("s", "unique_statement_idx", &["accountNumber", "statementDate"])
            .unwrap();

        let doc = statement("111", "2024-01-31");
        store.insert_one("s", &doc).unwrap();
        let err = store.insert_one("s", &doc).unwrap_err();
        match err {
            StoreError::Duplicate {
                account_number,
                statement_date,
                ..
            } => assert_eq!((account_number, statement_date), doc.natural_key()),
            other => panic!("expected duplicate, got {other}"),
        }
        assert_eq!(store.count("s"), 1);

        store.insert_one("s", &statement("111", "2024-02-29")).unwrap();
        assert_eq!(store.count("s"), 2);
    }

    #[test]
    fn test_no_uniqueness_without_index() {
        let mut store = MemoryStore::new();
        let doc = statement("111", "2024-01-31");
        store.insert_one("s", &doc).unwrap();
        store.insert_one("s", &doc).unwrap();
        assert_eq!(store.count("s"), 2);
    }

    #[test]
    fn test_ensure_index_is_idempotent() {
        let mut store = MemoryStore::new();
        let idx = IndexSpec::new("date_idx", &[("statementDate", IndexDirection::Descending)]);
        store.ensure_index("s", &idx).unwrap();
        store.ensure_index("s", &idx).unwrap();
        assert_eq!(store.indexes("s").unwrap(), vec!["date_idx".to_string()]);

        store.drop_indexes("s").unwrap();
        assert!(store.indexes("s").unwrap().is_empty());
    }

    #[test]
    fn test_find_sort_limit_and_clear() {
        let mut store = MemoryStore::new();
        for date in ["2024-01-31", "2024-03-31", "2024-02-29"] {
            store.insert_one("s", &statement("111", date)).unwrap();
        }
        let docs = store
            .find("s", &Filter::all(), Some(Sort::StatementDateDesc), Some(2))
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].statement_date > docs[1].statement_date);

        assert_eq!(store.clear("s").unwrap(), 3);
        assert!(store.find("missing", &Filter::all(), None, None).unwrap().is_empty());
    }
}
