//! Read-side reports over every collection in a store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use bankfusion_core::money::mean_abs;
use bankfusion_core::{round_cents, NormalizedStatement, NormalizedTransaction};

use crate::store::{sort_documents, Filter, Sort, StatementStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub total_statements: usize,
    pub total_transactions: usize,
    /// `(bankName, statements)`, largest first
    pub by_bank: Vec<(String, usize)>,
    pub earliest_statement: Option<DateTime<Utc>>,
    pub latest_statement: Option<DateTime<Utc>>,
}

/// A transaction together with the statement it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHit {
    pub account_number: String,
    pub bank_name: String,
    pub statement_date: DateTime<Utc>,
    pub transaction: NormalizedTransaction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub account_number: String,
    pub account_holder: String,
    pub bank_name: String,
    pub statements: usize,
    pub transactions: usize,
    pub total_credits: f64,
    pub total_debits: f64,
    pub average_amount: f64,
    pub max_amount: f64,
    pub first_transaction: DateTime<Utc>,
    pub last_transaction: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankOverview {
    pub collection: String,
    pub statements: usize,
    pub distinct_holders: usize,
    pub total_closing_balance: f64,
    pub total_credits: f64,
    pub total_debits: f64,
}

/// Matching statements from every collection, sorted and limited as a whole
fn gather<S: StatementStore + ?Sized>(
    store: &S,
    filter: &Filter,
    sort: Option<Sort>,
    limit: Option<usize>,
) -> Result<Vec<NormalizedStatement>, StoreError> {
    let mut docs = Vec::new();
    for collection in store.collections()? {
        docs.extend(store.find(&collection, filter, None, None)?);
    }
    sort_documents(&mut docs, sort);
    if let Some(limit) = limit {
        docs.truncate(limit);
    }
    Ok(docs)
}

fn hits<'a>(
    docs: &'a [NormalizedStatement],
) -> impl Iterator<Item = (&'a NormalizedStatement, &'a NormalizedTransaction)> {
    docs.iter()
        .flat_map(|d| d.transactions.iter().map(move |t| (d, t)))
}

fn hit(doc: &NormalizedStatement, txn: &NormalizedTransaction) -> TransactionHit {
    TransactionHit {
        account_number: doc.account_number.clone(),
        bank_name: doc.bank_name.clone(),
        statement_date: doc.statement_date,
        transaction: txn.clone(),
    }
}

pub fn database_stats<S: StatementStore + ?Sized>(store: &S) -> Result<DatabaseStats, StoreError> {
    let docs = gather(store, &Filter::all(), None, None)?;

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for d in &docs {
        *counts.entry(d.bank_name.as_str()).or_insert(0) += 1;
    }
    let mut by_bank: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, n)| (name.to_string(), n))
        .collect();
    by_bank.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(DatabaseStats {
        total_statements: docs.len(),
        total_transactions: docs.iter().map(|d| d.transactions.len()).sum(),
        by_bank,
        earliest_statement: docs.iter().map(|d| d.statement_date).min(),
        latest_statement: docs.iter().map(|d| d.statement_date).max(),
    })
}

/// Statements whose bank name contains `fragment` (case-insensitive), newest first
pub fn statements_by_bank<S: StatementStore + ?Sized>(
    store: &S,
    fragment: &str,
    limit: Option<usize>,
) -> Result<Vec<NormalizedStatement>, StoreError> {
    gather(store, &Filter::bank(fragment), Some(Sort::StatementDateDesc), limit)
}

pub fn statements_by_account<S: StatementStore + ?Sized>(
    store: &S,
    account_number: &str,
) -> Result<Vec<NormalizedStatement>, StoreError> {
    gather(
        store,
        &Filter::account(account_number),
        Some(Sort::StatementDateDesc),
        None,
    )
}

/// Statements dated within `[from, to]`, newest first
pub fn statements_by_date_range<S: StatementStore + ?Sized>(
    store: &S,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<NormalizedStatement>, StoreError> {
    gather(
        store,
        &Filter::date_range(from, to),
        Some(Sort::StatementDateDesc),
        None,
    )
}

/// Transactions with a signed amount in `[min, max]`, largest amount first
pub fn transactions_by_amount<S: StatementStore + ?Sized>(
    store: &S,
    min: f64,
    max: f64,
    bank: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<TransactionHit>, StoreError> {
    let filter = bank.map(Filter::bank).unwrap_or_default();
    let docs = gather(store, &filter, None, None)?;

    let mut found: Vec<TransactionHit> = hits(&docs)
        .filter(|(_, t)| t.amount >= min && t.amount <= max)
        .map(|(d, t)| hit(d, t))
        .collect();
    found.sort_by(|a, b| b.transaction.amount.total_cmp(&a.transaction.amount));
    if let Some(limit) = limit {
        found.truncate(limit);
    }
    Ok(found)
}

/// Transactions whose description contains `term` (case-insensitive),
/// newest transaction first
pub fn search_transactions<S: StatementStore + ?Sized>(
    store: &S,
    term: &str,
    limit: Option<usize>,
) -> Result<Vec<TransactionHit>, StoreError> {
    let needle = term.to_lowercase();
    let docs = gather(store, &Filter::all(), None, None)?;

    let mut found: Vec<TransactionHit> = hits(&docs)
        .filter(|(_, t)| t.description.to_lowercase().contains(&needle))
        .map(|(d, t)| hit(d, t))
        .collect();
    found.sort_by(|a, b| b.transaction.date.cmp(&a.transaction.date));
    if let Some(limit) = limit {
        found.truncate(limit);
    }
    Ok(found)
}

/// Totals over every transaction of one account. `None` when the account
/// has no transactions.
pub fn account_summary<S: StatementStore + ?Sized>(
    store: &S,
    account_number: &str,
) -> Result<Option<AccountSummary>, StoreError> {
    let docs = statements_by_account(store, account_number)?;
    let txns: Vec<&NormalizedTransaction> = hits(&docs).map(|(_, t)| t).collect();
    // newest statement first, so the holder/bank come from the latest one
    let Some(latest) = docs.first() else {
        return Ok(None);
    };
    if txns.is_empty() {
        return Ok(None);
    }

    let credits: f64 = txns.iter().filter(|t| t.is_credit()).map(|t| t.amount.abs()).sum();
    let debits: f64 = txns.iter().filter(|t| t.is_debit()).map(|t| t.amount.abs()).sum();
    let max_amount = txns.iter().map(|t| t.amount.abs()).fold(0.0, f64::max);

    Ok(Some(AccountSummary {
        account_number: account_number.to_string(),
        account_holder: latest.account_holder.clone(),
        bank_name: latest.bank_name.clone(),
        statements: docs.len(),
        transactions: txns.len(),
        total_credits: round_cents(credits),
        total_debits: round_cents(debits),
        average_amount: mean_abs(txns.iter().map(|t| t.amount)),
        max_amount: round_cents(max_amount),
        first_transaction: txns.iter().map(|t| t.date).min().unwrap_or(latest.statement_date),
        last_transaction: txns.iter().map(|t| t.date).max().unwrap_or(latest.statement_date),
    }))
}

/// Per-collection statistics, one row per non-empty collection
pub fn bank_overview<S: StatementStore + ?Sized>(
    store: &S,
) -> Result<Vec<BankOverview>, StoreError> {
    let mut rows = Vec::new();
    for collection in store.collections()? {
        let docs = store.find(&collection, &Filter::all(), None, None)?;
        if docs.is_empty() {
            continue;
        }
        let holders: BTreeSet<&str> = docs.iter().map(|d| d.account_holder.as_str()).collect();
        rows.push(BankOverview {
            statements: docs.len(),
            distinct_holders: holders.len(),
            total_closing_balance: round_cents(docs.iter().map(|d| d.closing_balance).sum()),
            total_credits: round_cents(docs.iter().map(|d| d.total_credits).sum()),
            total_debits: round_cents(docs.iter().map(|d| d.total_debits).sum()),
            collection,
        });
    }
    Ok(rows)
}
