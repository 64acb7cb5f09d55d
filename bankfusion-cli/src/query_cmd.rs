use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::Subcommand;

use bankfusion_core::NormalizedStatement;
use bankfusion_import::reports::{self, TransactionHit};
use bankfusion_import::StatementStore;

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Statements whose bank name contains NAME (case-insensitive)
    Bank {
        name: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// All statements for one account number
    Account { account: String },

    /// Statements dated between FROM and TO (YYYY-MM-DD, inclusive)
    Range { from: String, to: String },

    /// Transactions with a signed amount between --min and --max
    Amount {
        #[arg(long, allow_hyphen_values = true)]
        min: f64,
        #[arg(long, allow_hyphen_values = true)]
        max: f64,
        /// Only statements whose bank name contains this text
        #[arg(long)]
        bank: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Transactions whose description contains TERM
    Search {
        term: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Credit/debit summary for one account
    Summary { account: String },
}

fn day_start(s: &str) -> Result<DateTime<Utc>> {
    let d = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))?;
    Ok(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap_or_default()))
}

fn day_end(s: &str) -> Result<DateTime<Utc>> {
    let d = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))?;
    Ok(Utc.from_utc_datetime(&d.and_hms_milli_opt(23, 59, 59, 999).unwrap_or_default()))
}

fn print_statements(docs: &[NormalizedStatement]) {
    if docs.is_empty() {
        println!("No statements found.");
        return;
    }
    for d in docs {
        println!(
            "{} | {:<22} | {:<18} | {:<24} | txns={:<4} | cr={:.2} dr={:.2} net={:.2} | close={:.2}",
            d.statement_date.format("%Y-%m-%d"),
            d.bank_name,
            d.account_number,
            d.account_holder,
            d.transactions.len(),
            d.total_credits,
            d.total_debits,
            d.net_flow(),
            d.closing_balance
        );
    }
    println!("\n{} statement(s)", docs.len());
}

fn print_hits(hits: &[TransactionHit]) {
    if hits.is_empty() {
        println!("No transactions found.");
        return;
    }
    for h in hits {
        let t = &h.transaction;
        println!(
            "{} | {:>12.2} {:<6} | {:<18} | {}",
            t.date.format("%Y-%m-%d"),
            t.amount,
            t.transaction_type.as_str(),
            h.account_number,
            t.description
        );
    }
    println!("\n{} transaction(s)", hits.len());
}

pub fn run(store: &dyn StatementStore, command: QueryCommand) -> Result<()> {
    match command {
        QueryCommand::Bank { name, limit } => {
            print_statements(&reports::statements_by_bank(store, &name, Some(limit))?);
        }
        QueryCommand::Account { account } => {
            print_statements(&reports::statements_by_account(store, &account)?);
        }
        QueryCommand::Range { from, to } => {
            let docs = reports::statements_by_date_range(store, day_start(&from)?, day_end(&to)?)?;
            print_statements(&docs);
        }
        QueryCommand::Amount {
            min,
            max,
            bank,
            limit,
        } => {
            let hits = reports::transactions_by_amount(store, min, max, bank.as_deref(), Some(limit))?;
            print_hits(&hits);
        }
        QueryCommand::Search { term, limit } => {
            print_hits(&reports::search_transactions(store, &term, Some(limit))?);
        }
        QueryCommand::Summary { account } => match reports::account_summary(store, &account)? {
            Some(s) => {
                println!("Account:       {} ({})", s.account_number, s.bank_name);
                println!("Holder:        {}", s.account_holder);
                println!("Statements:    {}", s.statements);
                println!("Transactions:  {}", s.transactions);
                println!("Credits:       {:.2}", s.total_credits);
                println!("Debits:        {:.2}", s.total_debits);
                println!("Average:       {:.2}", s.average_amount);
                println!("Largest:       {:.2}", s.max_amount);
                println!(
                    "Activity:      {} .. {}",
                    s.first_transaction.format("%Y-%m-%d"),
                    s.last_transaction.format("%Y-%m-%d")
                );
            }
            None => println!("No transactions for account {account}."),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bounds_are_inclusive() {
        let start = day_start("2024-01-31").unwrap();
        let end = day_end("2024-01-31").unwrap();
        assert!(start < end);
        assert_eq!(end.format("%H:%M:%S").to_string(), "23:59:59");
        assert!(day_start("31/01/2024").is_err());
    }
}
