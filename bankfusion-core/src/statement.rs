//! Canonical statement and transaction documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bank::BankCode;
use crate::money::round_cents;

/// Placeholder used when a transaction has no description
pub const NO_DESCRIPTION: &str = "No description";
pub const UNCATEGORIZED: &str = "uncategorized";
pub const UNKNOWN_ACCOUNT: &str = "UNKNOWN";
pub const UNKNOWN_HOLDER: &str = "Unknown";
pub const DEFAULT_CURRENCY: &str = "INR";

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionType {
    #[serde(rename = "CREDIT")]
    Credit,
    #[serde(rename = "DEBIT")]
    Debit,
}

impl TransactionType {
    /// Classify by sign: negative amounts are withdrawals
    pub fn from_sign(amount: f64) -> Self {
        if amount < 0.0 {
            TransactionType::Debit
        } else {
            TransactionType::Credit
        }
    }

    /// Apply this type's sign convention to an amount
    pub fn signed(&self, amount: f64) -> f64 {
        if amount == 0.0 {
            return 0.0;
        }
        match self {
            TransactionType::Credit => amount.abs(),
            TransactionType::Debit => -amount.abs(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
        }
    }
}

/// One ledger entry in canonical form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransaction {
    pub date: DateTime<Utc>,
    pub description: String,
    /// Signed: credits are non-negative, debits non-positive
    pub amount: f64,
    pub transaction_type: TransactionType,
    /// Running balance after this entry
    pub balance: f64,
    pub reference: String,
    pub category: String,
}

impl NormalizedTransaction {
    pub fn is_credit(&self) -> bool {
        self.transaction_type == TransactionType::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.transaction_type == TransactionType::Debit
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StatementPeriod {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Provenance recorded at import time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportMetadata {
    pub imported_at: DateTime<Utc>,
    pub source_file: String,
    pub total_transactions: usize,
    pub detected_bank: BankCode,
}

/// One statement document in canonical form.
///
/// `(account_number, statement_date)` is the natural key used to reject
/// duplicate imports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStatement {
    pub account_number: String,
    pub bank_name: String,
    pub account_holder: String,
    pub statement_date: DateTime<Utc>,
    pub statement_period: StatementPeriod,
    pub opening_balance: f64,
    pub closing_balance: f64,
    pub total_credits: f64,
    pub total_debits: f64,
    pub currency: String,
    pub transactions: Vec<NormalizedTransaction>,
    pub metadata: ImportMetadata,
}

/// Credit/debit totals over a transaction list
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub credits: f64,
    pub debits: f64,
}

impl Totals {
    /// Sum absolute amounts per type, rounded to cents
    pub fn from_transactions(txns: &[NormalizedTransaction]) -> Self {
        let (credits, debits) = txns.iter().fold((0.0, 0.0), |(c, d), t| {
            match t.transaction_type {
                TransactionType::Credit => (c + t.amount.abs(), d),
                TransactionType::Debit => (c, d + t.amount.abs()),
            }
        });
        Self {
            credits: round_cents(credits),
            debits: round_cents(debits),
        }
    }
}

impl NormalizedStatement {
    /// Natural key as stored: account number plus RFC 3339 statement date
    pub fn natural_key(&self) -> (String, String) {
        (self.account_number.clone(), self.statement_date.to_rfc3339())
    }

    pub fn bank(&self) -> BankCode {
        self.metadata.detected_bank
    }

    /// Net movement (credits minus debits) over the statement
    pub fn net_flow(&self) -> f64 {
        round_cents(self.total_credits - self.total_debits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn txn(amount: f64, kind: TransactionType) -> NormalizedTransaction {
        NormalizedTransaction {
            date: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            description: "NEFT".to_string(),
            amount,
            transaction_type: kind,
            balance: 0.0,
            reference: String::new(),
            category: UNCATEGORIZED.to_string(),
        }
    }

    #[test]
    fn test_sign_convention() {
        assert_eq!(TransactionType::Debit.signed(200.0), -200.0);
        assert_eq!(TransactionType::Credit.signed(-50.0), 50.0);
        assert_eq!(TransactionType::from_sign(-0.01), TransactionType::Debit);
        assert_eq!(TransactionType::from_sign(0.0), TransactionType::Credit);
    }

    #[test]
    fn test_totals_use_absolute_amounts() {
        let txns = vec![
            txn(500.0, TransactionType::Credit),
            txn(-200.0, TransactionType::Debit),
            txn(-150.0, TransactionType::Debit),
        ];
        let totals = Totals::from_transactions(&txns);
        assert_eq!(totals.credits, 500.0);
        assert_eq!(totals.debits, 350.0);
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(txn(-10.0, TransactionType::Debit)).unwrap();
        assert_eq!(value["transactionType"], "DEBIT");
        assert!(value.get("transaction_type").is_none());
    }
}
