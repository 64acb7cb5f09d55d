//! Raw statement JSON -> [`NormalizedStatement`].
//!
//! Normalization is total: any JSON value produces a statement with every
//! key field populated. Field-level failures degrade to defaults:
//! unparseable dates become "now", non-numeric amounts become 0, missing
//! descriptions become "No description".

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use bankfusion_core::statement::{NO_DESCRIPTION, UNCATEGORIZED, UNKNOWN_ACCOUNT};
use bankfusion_core::{
    BankCode, ImportMetadata, NormalizedStatement, NormalizedTransaction, StatementPeriod, Totals,
    TransactionType,
};

use crate::aliases::{lookup, Field};
use crate::bank_rules::DescriptionCleaner;
use crate::coerce::{parse_date, parse_date_str, parse_number, parse_transaction_type, text};
use crate::holder::HolderCleaner;
use crate::types::NormalizeOptions;

pub struct Normalizer {
    options: NormalizeOptions,
    now: DateTime<Utc>,
    holder: HolderCleaner,
    descriptions: DescriptionCleaner,
    period_range: Regex,
}

impl Normalizer {
    /// Normalizer whose "now" fallback is the wall clock at construction
    pub fn new(options: NormalizeOptions) -> Result<Self> {
        Self::at(options, Utc::now())
    }

    /// Normalizer with a fixed "now", for reproducible output
    pub fn at(options: NormalizeOptions, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            options,
            now,
            holder: HolderCleaner::new()?,
            descriptions: DescriptionCleaner::new()?,
            period_range: Regex::new(r"(?i)^\s*(?:from\s+)?(.+?)\s+(?:to|-)\s+(.+?)\s*$")?,
        })
    }

    pub fn normalize(&self, raw: &Value, filename: &str, bank: BankCode) -> NormalizedStatement {
        let transactions = self.transactions(raw, bank);
        let totals = Totals::from_transactions(&transactions);

        let account_number = lookup(raw, Field::AccountNumber)
            .and_then(text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string());

        let declared_holder = lookup(raw, Field::AccountHolder).and_then(text);
        let account_holder = self.holder.resolve(declared_holder.as_deref(), filename);

        let currency = lookup(raw, Field::Currency)
            .and_then(text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.options.default_currency.clone());

        NormalizedStatement {
            account_number,
            bank_name: bank.display_name().to_string(),
            account_holder,
            statement_date: self.date_or_now(lookup(raw, Field::StatementDate), "statementDate"),
            statement_period: self.period(raw),
            opening_balance: self.number_or_zero(lookup(raw, Field::OpeningBalance)),
            closing_balance: self.number_or_zero(lookup(raw, Field::ClosingBalance)),
            total_credits: totals.credits,
            total_debits: totals.debits,
            currency,
            metadata: ImportMetadata {
                imported_at: self.now,
                source_file: filename.to_string(),
                total_transactions: transactions.len(),
                detected_bank: bank,
            },
            transactions,
        }
    }

    fn transactions(&self, raw: &Value, bank: BankCode) -> Vec<NormalizedTransaction> {
        let Some(entries) = lookup(raw, Field::Transactions).and_then(Value::as_array) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let (txn, placeholder) = self.transaction(entry, bank);
                let filler = placeholder && txn.amount == 0.0;
                (!(filler && self.options.drop_placeholder_transactions)).then_some(txn)
            })
            .collect()
    }

    /// Normalize one entry. The flag reports whether the description fell
    /// back to the placeholder.
    pub fn transaction(&self, entry: &Value, bank: BankCode) -> (NormalizedTransaction, bool) {
        let (raw_amount, column_type) = resolve_amount(entry);

        let transaction_type = lookup(entry, Field::TxType)
            .and_then(parse_transaction_type)
            .or(column_type)
            .unwrap_or_else(|| TransactionType::from_sign(raw_amount));

        let description = lookup(entry, Field::TxDescription)
            .and_then(text)
            .map(|d| self.descriptions.clean(bank, &d))
            .filter(|d| !d.is_empty());
        let placeholder = description.is_none();

        let txn = NormalizedTransaction {
            date: self.date_or_now(lookup(entry, Field::TxDate), "transactions[].date"),
            description: description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            amount: transaction_type.signed(raw_amount),
            transaction_type,
            balance: self.number_or_zero(lookup(entry, Field::TxBalance)),
            reference: lookup(entry, Field::TxReference)
                .and_then(text)
                .unwrap_or_default(),
            category: lookup(entry, Field::TxCategory)
                .and_then(text)
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        };
        (txn, placeholder)
    }

    fn period(&self, raw: &Value) -> StatementPeriod {
        let (nested_from, nested_to) = match lookup(raw, Field::Period) {
            Some(p) if p.is_object() => (
                lookup(p, Field::PeriodStart).and_then(parse_date),
                lookup(p, Field::PeriodEnd).and_then(parse_date),
            ),
            Some(Value::String(s)) => self.split_period(s),
            _ => (None, None),
        };

        let from = nested_from.or_else(|| lookup(raw, Field::PeriodFrom).and_then(parse_date));
        let to = nested_to.or_else(|| lookup(raw, Field::PeriodTo).and_then(parse_date));

        StatementPeriod {
            from: from.unwrap_or_else(|| self.fallback_now("statementPeriod.from")),
            to: to.unwrap_or_else(|| self.fallback_now("statementPeriod.to")),
        }
    }

    /// `"01/01/2024 to 31/01/2024"` or `"01 Jan 2024 - 31 Jan 2024"`
    fn split_period(&self, s: &str) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self.period_range.captures(s) {
            Some(caps) => (parse_date_str(&caps[1]), parse_date_str(&caps[2])),
            None => (None, None),
        }
    }

    fn date_or_now(&self, value: Option<&Value>, field: &str) -> DateTime<Utc> {
        value
            .and_then(parse_date)
            .unwrap_or_else(|| self.fallback_now(field))
    }

    fn fallback_now(&self, field: &str) -> DateTime<Utc> {
        debug!(field, "date missing or unparseable, using import time");
        self.now
    }

    fn number_or_zero(&self, value: Option<&Value>) -> f64 {
        value.and_then(parse_number).unwrap_or(0.0)
    }
}

/// Amount magnitude plus the type implied by a non-zero withdrawal/deposit
/// column. A zero or missing `amount` falls through to the columns.
fn resolve_amount(entry: &Value) -> (f64, Option<TransactionType>) {
    let number = |field| {
        lookup(entry, field)
            .and_then(parse_number)
            .filter(|n| *n != 0.0)
    };
    let withdrawal = number(Field::TxWithdrawal);
    let deposit = number(Field::TxDeposit);

    let column_type = match (withdrawal, deposit) {
        (Some(_), _) => Some(TransactionType::Debit),
        (None, Some(_)) => Some(TransactionType::Credit),
        (None, None) => None,
    };
    let amount = number(Field::TxAmount)
        .or(withdrawal)
        .or(deposit)
        .unwrap_or(0.0);
    (amount, column_type)
}
