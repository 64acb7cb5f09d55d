//! SQLite-backed document store.
//!
//! Each collection is a table holding the statement JSON plus the columns
//! that indexes can target. Transaction dates live in a child table so that
//! `transactions.date` can be indexed.

use chrono::SecondsFormat;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

use bankfusion_core::NormalizedStatement;

use super::{
    Filter, IndexDirection, IndexSpec, InsertResult, Sort, StatementStore, StoreError,
};

const REGISTRY_TABLE: &str = "bf_collections";

pub struct SqliteStore {
    conn: Connection,
}

/// Column an index key maps to, and whether it lives in the child table.
fn column_for(field: &str) -> Option<(&'static str, bool)> {
    match field {
        "accountNumber" => Some(("account_number", false)),
        "statementDate" => Some(("statement_date", false)),
        "accountHolder" => Some(("account_holder", false)),
        "bankName" => Some(("bank_name", false)),
        "transactions.date" => Some(("date", true)),
        _ => None,
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn checked(name: &str, operation: &str) -> Result<(), StoreError> {
    if valid_name(name) {
        Ok(())
    } else {
        Err(StoreError::backend(operation, format!("invalid name '{name}'")))
    }
}

fn child_table(collection: &str) -> String {
    format!("{collection}__transactions")
}

/// Fixed-width UTC timestamps so text order equals time order
fn sortable(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `%fragment%` with LIKE wildcards in `fragment` escaped by `\`
fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn classify_error(operation: &str, err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(code, _) = &err {
        match code.code {
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::SystemIoFailure
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::PermissionDenied => {
                return StoreError::Unavailable {
                    operation: operation.to_string(),
                    message: err.to_string(),
                };
            }
            _ => {}
        }
    }
    StoreError::backend(operation, err)
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StoreError::Unavailable {
            operation: format!("open {}", path.display()),
            message: e.to_string(),
        })?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "SQLite store opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Unavailable {
            operation: "open in-memory database".to_string(),
            message: e.to_string(),
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS {REGISTRY_TABLE} (
                name TEXT PRIMARY KEY,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
             );"
        ))
        .map_err(|e| classify_error("initialize schema", e))?;
        Ok(Self { conn })
    }

    fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT 1 FROM {REGISTRY_TABLE} WHERE name = ?1"),
                params![name],
                |_| Ok(()),
            )
            .optional()
            .map(|r| r.is_some())
            .map_err(|e| classify_error("list collections", e))
    }

    fn insert_rows(&mut self, collection: &str, doc: &NormalizedStatement) -> rusqlite::Result<i64> {
        let document = serde_json::to_string(doc)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let tx = self.conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO \"{collection}\"
                    (account_number, statement_date, account_holder, bank_name, document)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            ),
            params![
                doc.account_number,
                sortable(&doc.statement_date),
                doc.account_holder,
                doc.bank_name,
                document,
            ],
        )?;
        let id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" (statement_id, position, date) VALUES (?1, ?2, ?3)",
                child_table(collection)
            ))?;
            for (i, t) in doc.transactions.iter().enumerate() {
                stmt.execute(params![id, i as i64, sortable(&t.date)])?;
            }
        }
        tx.commit()?;
        Ok(id)
    }
}

impl StatementStore for SqliteStore {
    fn ensure_collection(&mut self, name: &str) -> Result<(), StoreError> {
        checked(name, "create collection")?;
        let child = child_table(name);
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{name}\" (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    account_number TEXT NOT NULL,
                    statement_date TEXT NOT NULL,
                    account_holder TEXT NOT NULL,
                    bank_name TEXT NOT NULL,
                    document TEXT NOT NULL,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
                 );
                 CREATE TABLE IF NOT EXISTS \"{child}\" (
                    statement_id INTEGER NOT NULL REFERENCES \"{name}\"(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    date TEXT NOT NULL
                 );
                 INSERT OR IGNORE INTO {REGISTRY_TABLE} (name) VALUES ('{name}');"
            ))
            .map_err(|e| classify_error(&format!("create collection {name}"), e))?;
        Ok(())
    }

    fn ensure_index(&mut self, collection: &str, index: &IndexSpec) -> Result<(), StoreError> {
        let operation = format!("create index {} on {collection}", index.name);
        checked(&index.name, &operation)?;
        self.ensure_collection(collection)?;

        let mut columns = Vec::new();
        let mut on_child = None;
        for key in &index.keys {
            let (column, child) = column_for(&key.field).ok_or_else(|| {
                StoreError::backend(&operation, format!("unsupported index field '{}'", key.field))
            })?;
            if on_child.is_some_and(|c| c != child) {
                return Err(StoreError::backend(&operation, "index mixes statement and transaction fields"));
            }
            on_child = Some(child);
            let dir = match key.direction {
                IndexDirection::Ascending => "ASC",
                IndexDirection::Descending => "DESC",
            };
            columns.push(format!("{column} {dir}"));
        }

        let table = if on_child == Some(true) {
            child_table(collection)
        } else {
            collection.to_string()
        };
        let full_name = format!("{collection}__{}", index.name);
        let unique = if index.unique { "UNIQUE " } else { "" };
        let create = format!(
            "CREATE {unique}INDEX \"{full_name}\" ON \"{table}\" ({})",
            columns.join(", ")
        );

        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'index' AND name = ?1",
                params![full_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| classify_error(&operation, e))?;

        match existing {
            Some(sql) if sql == create => return Ok(()),
            Some(_) => {
                debug!(index = %full_name, "index definition changed, recreating");
                self.conn
                    .execute(&format!("DROP INDEX \"{full_name}\""), [])
                    .map_err(|e| classify_error(&operation, e))?;
            }
            None => {}
        }

        self.conn
            .execute(&create, [])
            .map_err(|e| classify_error(&operation, e))?;
        Ok(())
    }

    fn insert_one(
        &mut self,
        collection: &str,
        doc: &NormalizedStatement,
    ) -> Result<InsertResult, StoreError> {
        if !self.collection_exists(collection)? {
            self.ensure_collection(collection)?;
        }

        match self.insert_rows(collection, doc) {
            Ok(id) => Ok(InsertResult {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(code, _))
                if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::Duplicate {
                    collection: collection.to_string(),
                    account_number: doc.account_number.clone(),
                    statement_date: doc.statement_date.to_rfc3339(),
                })
            }
            Err(rusqlite::Error::ToSqlConversionFailure(e)) => {
                Err(StoreError::Serialization(e.to_string()))
            }
            Err(e) => Err(classify_error(&format!("insert into {collection}"), e)),
        }
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<NormalizedStatement>, StoreError> {
        checked(collection, "find")?;
        if !self.collection_exists(collection)? {
            return Ok(Vec::new());
        }

        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(a) = &filter.account_number {
            values.push(a.clone());
            clauses.push(format!("account_number = ?{}", values.len()));
        }
        if let Some(b) = &filter.bank_name_contains {
            values.push(like_pattern(b));
            clauses.push(format!("bank_name LIKE ?{} ESCAPE '\\'", values.len()));
        }
        if let Some(h) = &filter.account_holder_contains {
            values.push(like_pattern(h));
            clauses.push(format!("account_holder LIKE ?{} ESCAPE '\\'", values.len()));
        }
        if let Some(from) = &filter.statement_date_from {
            values.push(sortable(from));
            clauses.push(format!("statement_date >= ?{}", values.len()));
        }
        if let Some(to) = &filter.statement_date_to {
            values.push(sortable(to));
            clauses.push(format!("statement_date <= ?{}", values.len()));
        }

        let mut sql = format!("SELECT document FROM \"{collection}\"");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        match sort {
            Some(Sort::StatementDateAsc) => sql.push_str(" ORDER BY statement_date ASC, id ASC"),
            Some(Sort::StatementDateDesc) => sql.push_str(" ORDER BY statement_date DESC, id ASC"),
            None => sql.push_str(" ORDER BY id ASC"),
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let operation = format!("find in {collection}");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| classify_error(&operation, e))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))
            .map_err(|e| classify_error(&operation, e))?;

        let mut docs = Vec::new();
        for row in rows {
            let json = row.map_err(|e| classify_error(&operation, e))?;
            let doc: NormalizedStatement = serde_json::from_str(&json)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            docs.push(doc);
        }
        Ok(docs)
    }

    fn collections(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT name FROM {REGISTRY_TABLE} ORDER BY name"))
            .map_err(|e| classify_error("list collections", e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| classify_error("list collections", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| classify_error("list collections", e))?;
        Ok(names)
    }

    fn indexes(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        checked(collection, "list indexes")?;
        let prefix = format!("{collection}__");
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'index' AND sql IS NOT NULL AND tbl_name IN (?1, ?2)
                 ORDER BY name",
            )
            .map_err(|e| classify_error("list indexes", e))?;
        let names = stmt
            .query_map(params![collection, child_table(collection)], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| classify_error("list indexes", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| classify_error("list indexes", e))?;
        Ok(names
            .into_iter()
            .map(|n| n.strip_prefix(&prefix).map(str::to_string).unwrap_or(n))
            .collect())
    }

    fn drop_indexes(&mut self, collection: &str) -> Result<(), StoreError> {
        for name in self.indexes(collection)? {
            self.conn
                .execute(&format!("DROP INDEX IF EXISTS \"{collection}__{name}\""), [])
                .map_err(|e| classify_error(&format!("drop index {name}"), e))?;
        }
        Ok(())
    }

    fn clear(&mut self, collection: &str) -> Result<usize, StoreError> {
        checked(collection, "clear")?;
        if !self.collection_exists(collection)? {
            return Ok(0);
        }
        let operation = format!("clear {collection}");
        self.conn
            .execute(&format!("DELETE FROM \"{}\"", child_table(collection)), [])
            .map_err(|e| classify_error(&operation, e))?;
        self.conn
            .execute(&format!("DELETE FROM \"{collection}\""), [])
            .map_err(|e| classify_error(&operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::statement;

    fn unique(store: &mut SqliteStore, collection: &str) {
        store
            .ensure_unique_index(collection, "unique_statement_idx", &["accountNumber", "statementDate"])
            .unwrap();
    }

    #[test]
    fn test_duplicate_detection() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.ensure_collection("hdfc_statements").unwrap();
        unique(&mut store, "hdfc_statements");

        let doc = statement("111", "2024-01-31");
        store.insert_one("hdfc_statements", &doc).unwrap();
        let err = store.insert_one("hdfc_statements", &doc).unwrap_err();
        assert!(err.is_duplicate(), "expected duplicate, got {err}");
    }

    #[test]
    fn test_other_constraint_failures_are_not_duplicates() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.ensure_collection("s").unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_all BEFORE INSERT ON \"s\"
                 BEGIN SELECT RAISE(ABORT, 'statement rejected'); END;",
            )
            .unwrap();

        let err = store.insert_one("s", &statement("111", "2024-01-31")).unwrap_err();
        assert!(!err.is_duplicate(), "unexpected duplicate: {err}");
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("statement rejected"));
    }

    #[test]
    fn test_unreachable_database_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        for path in [dir.path().to_path_buf(), dir.path().join("missing").join("bankfusion.db")] {
            match SqliteStore::open(&path) {
                Ok(_) => panic!("opened {}", path.display()),
                Err(e) => assert!(e.is_fatal(), "expected fatal error, got {e}"),
            }
        }
    }

    #[test]
    fn test_bank_filter_treats_wildcards_literally() {
        assert_eq!(like_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");

        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut spaced = statement("111", "2024-01-31");
        spaced.bank_name = "HDFC Bank".into();
        let mut underscored = statement("222", "2024-01-31");
        underscored.bank_name = "HDFC_Bank".into();
        store.insert_one("s", &spaced).unwrap();
        store.insert_one("s", &underscored).unwrap();

        let hits = store.find("s", &Filter::bank("c_b"), None, None).unwrap();
        assert_eq!(hits, vec![underscored.clone()]);
        assert!(store.find("s", &Filter::bank("%"), None, None).unwrap().is_empty());

        let mut memory = crate::MemoryStore::new();
        memory.insert_one("s", &spaced).unwrap();
        memory.insert_one("s", &underscored).unwrap();
        assert_eq!(memory.find("s", &Filter::bank("c_b"), None, None).unwrap(), hits);
    }

    #[test]
    fn test_round_trip_document() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let doc = statement("222", "2024-02-29");
        store.insert_one("sbi_statements", &doc).unwrap();

        let found = store
            .find("sbi_statements", &Filter::account("222"), None, None)
            .unwrap();
        assert_eq!(found, vec![doc]);
        assert_eq!(store.collections().unwrap(), vec!["sbi_statements".to_string()]);
    }

    #[test]
    fn test_indexes_are_idempotent_and_droppable() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let date_idx = IndexSpec::new("date_idx", &[("statementDate", IndexDirection::Descending)]);
        let tx_idx =
            IndexSpec::new("transaction_date_idx", &[("transactions.date", IndexDirection::Ascending)]);
        for _ in 0..2 {
            unique(&mut store, "axis_bank_statements");
            store.ensure_index("axis_bank_statements", &date_idx).unwrap();
            store.ensure_index("axis_bank_statements", &tx_idx).unwrap();
        }
        assert_eq!(
            store.indexes("axis_bank_statements").unwrap(),
            vec!["date_idx", "transaction_date_idx", "unique_statement_idx"]
        );

        store.drop_indexes("axis_bank_statements").unwrap();
        assert!(store.indexes("axis_bank_statements").unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_index_field() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let idx = IndexSpec::new("odd_idx", &[("metadata.sourceFile", IndexDirection::Ascending)]);
        let err = store.ensure_index("s", &idx).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_invalid_collection_name() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.ensure_collection("bad name; DROP").is_err());
    }

    #[test]
    fn test_filter_and_sort() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for date in ["2024-01-31", "2024-03-31", "2024-02-29"] {
            store.insert_one("s", &statement("111", date)).unwrap();
        }
        let from = statement("x", "2024-02-01").statement_date;
        let to = statement("x", "2024-03-31").statement_date;
        let docs = store
            .find("s", &Filter::date_range(from, to), Some(Sort::StatementDateDesc), None)
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].statement_date, to);

        assert_eq!(store.clear("s").unwrap(), 3);
    }
}
