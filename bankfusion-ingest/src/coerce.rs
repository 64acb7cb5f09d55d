//! Value coercion for loosely typed JSON: numbers, dates, text.
//!
//! All functions return `None` on failure; callers decide the default.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use bankfusion_core::TransactionType;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

// Day-first: Indian statements never use month-first numeric dates.
// Day-first patterns come before year-first ones, otherwise `15/01/24`
// would parse as year 15.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
];

/// Parse a number from a JSON number or a formatted amount string.
///
/// Accepts `"1,23,456.78"`, `"₹ 500"`, `"Rs. 20.00"`, `"62,541.51Cr"`,
/// `"150.00 Dr"` (negative) and `"(75.00)"` (negative).
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_number_str(s),
        _ => None,
    }
}

fn parse_number_str(raw: &str) -> Option<f64> {
    let mut s = raw.trim().to_uppercase();
    let mut sign = 1.0;

    for (marker, marker_sign) in [("DR.", -1.0), ("DR", -1.0), ("CR.", 1.0), ("CR", 1.0)] {
        if let Some(rest) = s.strip_suffix(marker) {
            s = rest.to_string();
            sign = marker_sign;
            break;
        }
    }

    for currency in ["₹", "RS.", "RS", "INR"] {
        s = s.replace(currency, "");
    }
    s.retain(|c| c != ',' && !c.is_whitespace());

    if let Some(inner) = s.strip_prefix('(').and_then(|x| x.strip_suffix(')')) {
        s = inner.to_string();
        sign = -sign;
    }

    let n: f64 = s.parse().ok()?;
    n.is_finite().then_some(n * sign)
}

/// Parse a calendar timestamp.
///
/// Strings go through RFC 3339, RFC 2822 and the known statement formats;
/// numbers are epoch milliseconds; `{"$date": ...}` is unwrapped.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::Object(map) => {
            if let Some(inner) = map.get("$date") {
                parse_date(inner)
            } else {
                map.get("$numberLong")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(DateTime::from_timestamp_millis)
            }
        }
        _ => None,
    }
}

pub fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(widen_year(ndt.date())?.and_time(ndt.time()).and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(widen_year(d)?.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

/// Two-digit years (`15/01/24`) land in 20YY.
fn widen_year(d: NaiveDate) -> Option<NaiveDate> {
    if (0..100).contains(&d.year()) {
        d.with_year(d.year() + 2000)
    } else {
        Some(d)
    }
}

/// Display text from a string, number or bool; trimmed.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Collapse runs of whitespace into single spaces
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Explicit credit/debit marker. Unrecognized markers yield `None`.
pub fn parse_transaction_type(value: &Value) -> Option<TransactionType> {
    let s = value.as_str()?.trim().trim_end_matches('.').to_ascii_uppercase();
    match s.as_str() {
        "CREDIT" | "CR" | "C" | "DEPOSIT" => Some(TransactionType::Credit),
        "DEBIT" | "DR" | "D" | "WITHDRAWAL" => Some(TransactionType::Debit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number(&json!(500)), Some(500.0));
        assert_eq!(parse_number(&json!("1,23,456.78")), Some(123456.78));
        assert_eq!(parse_number(&json!("₹ 500.50")), Some(500.5));
        assert_eq!(parse_number(&json!("Rs. 20.00")), Some(20.0));
        assert_eq!(parse_number(&json!("62,541.51Cr")), Some(62541.51));
        assert_eq!(parse_number(&json!("150.00 Dr")), Some(-150.0));
        assert_eq!(parse_number(&json!("(75.00)")), Some(-75.0));
        assert_eq!(parse_number(&json!("-0.5")), Some(-0.5));
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert_eq!(parse_number(&json!("abc")), None);
        assert_eq!(parse_number(&json!("NaN")), None);
        assert_eq!(parse_number(&json!(true)), None);
        assert_eq!(parse_number(&json!(null)), None);
        assert_eq!(parse_number(&json!({"v": 1})), None);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date(&json!("2024-01-15")), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(&json!("15/01/2024")), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(&json!("15-01-2024")), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(&json!("15/01/24")), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(&json!("15 Jan 2024")), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(&json!("15-Jan-2024")), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(&json!("Jan 15, 2024")), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(&json!("2024/01/15")), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn test_parse_date_with_time() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_date(&json!("2024-03-01T10:30:00Z")), Some(expected));
        assert_eq!(parse_date(&json!("2024-03-01T16:00:00+05:30")), Some(expected));
        assert_eq!(parse_date(&json!("2024-03-01 10:30:00")), Some(expected));
    }

    #[test]
    fn test_parse_date_epoch_and_extended_json() {
        let expected = ymd(2024, 1, 15);
        let ms = expected.timestamp_millis();
        assert_eq!(parse_date(&json!(ms)), Some(expected));
        assert_eq!(parse_date(&json!({"$date": "2024-01-15T00:00:00Z"})), Some(expected));
        assert_eq!(
            parse_date(&json!({"$date": {"$numberLong": ms.to_string()}})),
            Some(expected)
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(&json!("Available in Statement")), None);
        assert_eq!(parse_date(&json!("31/02/2024")), None);
        assert_eq!(parse_date(&json!("")), None);
        assert_eq!(parse_date(&json!(null)), None);
    }

    #[test]
    fn test_transaction_type_markers() {
        assert_eq!(parse_transaction_type(&json!("Credit")), Some(TransactionType::Credit));
        assert_eq!(parse_transaction_type(&json!("cr.")), Some(TransactionType::Credit));
        assert_eq!(parse_transaction_type(&json!(" DR ")), Some(TransactionType::Debit));
        assert_eq!(parse_transaction_type(&json!("UPI")), None);
        assert_eq!(parse_transaction_type(&json!(1)), None);
    }

    #[test]
    fn test_text_and_whitespace() {
        assert_eq!(text(&json!(1234567890)), Some("1234567890".to_string()));
        assert_eq!(text(&json!("  x ")), Some("x".to_string()));
        assert_eq!(text(&json!([1])), None);
        assert_eq!(collapse_whitespace(" TO  TRF.\n  RENT "), "TO TRF. RENT");
    }
}
