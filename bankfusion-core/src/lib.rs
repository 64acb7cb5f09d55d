//! bankfusion-core: canonical statement model shared by ingest, import and reporting

pub mod bank;
pub mod money;
pub mod statement;

pub use bank::{BankCode, BankProfile, BANKS};
pub use money::round_cents;
pub use statement::{
    ImportMetadata, NormalizedStatement, NormalizedTransaction, StatementPeriod, Totals,
    TransactionType,
};
