//! Ordered source-key aliases for every canonical field.
//!
//! Extraction tools disagree on key names (camelCase, snake_case, bank
//! specific spellings such as `withdrawl`). Each canonical field owns one
//! ordered alias list and [`lookup`] takes the first usable value.

use serde_json::Value;

/// Canonical fields reconciled from raw statement JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    BankName,
    AccountNumber,
    AccountHolder,
    StatementDate,
    /// Nested `{from, to}` object or a `"<date> to <date>"` string
    Period,
    PeriodStart,
    PeriodEnd,
    PeriodFrom,
    PeriodTo,
    OpeningBalance,
    ClosingBalance,
    Currency,
    Transactions,
    TxAmount,
    TxWithdrawal,
    TxDeposit,
    TxType,
    TxDate,
    TxDescription,
    TxBalance,
    TxReference,
    TxCategory,
}

impl Field {
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::BankName => &["bank_name", "bankName", "bank", "Bank", "institution"],
            Field::AccountNumber => &["account_number", "accountNumber", "accountNo", "account_no"],
            Field::AccountHolder => &[
                "account_holder",
                "accountHolder",
                "holderName",
                "holder_name",
                "customer_name",
                "name",
            ],
            Field::StatementDate => &["statement_date", "statementDate"],
            Field::Period => &["statement_period", "statementPeriod"],
            Field::PeriodStart => &["from", "start", "start_date"],
            Field::PeriodEnd => &["to", "end", "end_date"],
            Field::PeriodFrom => &["periodFrom", "period_from", "startDate", "start_date", "from_date"],
            Field::PeriodTo => &["periodTo", "period_to", "endDate", "end_date", "to_date"],
            Field::OpeningBalance => &["openingBalance", "opening_balance"],
            Field::ClosingBalance => &["closingBalance", "closing_balance"],
            Field::Currency => &["currency"],
            Field::Transactions => &["transactions", "txns", "entries"],
            Field::TxAmount => &["amount", "txn_amount", "transaction_amount"],
            Field::TxWithdrawal => &["withdrawal", "withdrawl", "debit", "debit_amount"],
            Field::TxDeposit => &["deposit", "credit", "credit_amount"],
            Field::TxType => &["transaction_type", "transactionType", "type", "txType", "dr_cr"],
            Field::TxDate => &["date", "transaction_date", "txDate", "value_date", "txn_date"],
            Field::TxDescription => &["description", "particulars", "narration", "desc", "remarks"],
            Field::TxBalance => &["balance", "running_balance", "runningBalance", "closing_balance"],
            Field::TxReference => &["reference", "chq_no", "ref_no", "refNo", "cheque_no"],
            Field::TxCategory => &["category"],
        }
    }
}

/// First alias of `field` whose value is usable.
///
/// `null` and blank strings count as absent. `0`, `false` and empty
/// arrays are real values and are returned as-is.
pub fn lookup(obj: &Value, field: Field) -> Option<&Value> {
    let map = obj.as_object()?;
    field
        .aliases()
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|v| is_present(v))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_alias_wins() {
        let raw = json!({"accountNo": "111", "account_number": "222"});
        assert_eq!(lookup(&raw, Field::AccountNumber), Some(&json!("222")));
    }

    #[test]
    fn test_zero_is_not_masked() {
        let raw = json!({"openingBalance": 0, "opening_balance": 900});
        assert_eq!(lookup(&raw, Field::OpeningBalance), Some(&json!(0)));
    }

    #[test]
    fn test_null_and_blank_fall_through() {
        let raw = json!({"description": null, "particulars": "  ", "narration": "UPI/123"});
        assert_eq!(lookup(&raw, Field::TxDescription), Some(&json!("UPI/123")));
    }

    #[test]
    fn test_non_object_has_no_fields() {
        assert_eq!(lookup(&json!([1, 2]), Field::Transactions), None);
        assert_eq!(lookup(&json!("x"), Field::BankName), None);
    }
}
