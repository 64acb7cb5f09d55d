//! bankfusion-import: statement storage, the import coordinator, run statistics and reports

pub mod importer;
pub mod reports;
pub mod stats;
pub mod store;

pub use importer::{ImportError, ImportSettings, Importer, Layout, UNIFIED_COLLECTION};
pub use stats::{ErrorDetail, ImportOutcome, ImportRunStats};
pub use store::{
    Filter, IndexDirection, IndexSpec, InsertResult, MemoryStore, Sort, SqliteStore,
    StatementStore, StoreError,
};
