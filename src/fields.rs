//! Market-data field codes and value decoding.
//!
//! Snapshot payloads are keyed by small integer codes (as strings) whose
//! meaning is fixed by the gateway. Values usually arrive as strings such
//! as `"189.50"`, `"C189.50"` (closing price marker), `"0.6%"` or `"2.95T"`.

use serde_json::Value;

pub const LAST_PRICE: &str = "31";
pub const SYMBOL: &str = "55";
pub const CHANGE: &str = "82";
pub const CHANGE_PCT: &str = "83";
pub const BID: &str = "84";
pub const ASK: &str = "86";
pub const VOLUME: &str = "87";
pub const CLOSE: &str = "88";

pub const AVG_VOLUME: &str = "7282";
pub const DIVIDEND_YIELD: &str = "7287";
pub const MARKET_CAP: &str = "7289";
pub const PE_RATIO: &str = "7290";
pub const EPS: &str = "7291";
pub const HIGH_52W: &str = "7293";
pub const LOW_52W: &str = "7294";

/// Fields requested for a quote.
pub const QUOTE_FIELDS: &[&str] = &[
    LAST_PRICE, BID, ASK, VOLUME, CLOSE, CHANGE, CHANGE_PCT, SYMBOL,
];

/// Fields requested for fundamentals. Disjoint from [`QUOTE_FIELDS`].
pub const FUNDAMENTAL_FIELDS: &[&str] = &[
    MARKET_CAP,
    PE_RATIO,
    EPS,
    DIVIDEND_YIELD,
    HIGH_52W,
    LOW_52W,
    AVG_VOLUME,
];

/// True unless the value is null, a blank string or an empty container.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Decode a field value to a number.
///
/// Accepts JSON numbers and numeric strings with an optional `C`/`H`
/// status prefix, `,` separators, a trailing `%` and a `K`/`M`/`B`/`T`
/// magnitude suffix.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric_str(s),
        _ => None,
    }
}

fn parse_numeric_str(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix(['C', 'H']) {
        s = rest;
    }
    let s = s.trim_end_matches('%').trim();
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();

    let (digits, scale) = match cleaned.chars().last() {
        Some('K' | 'k') => (&cleaned[..cleaned.len() - 1], 1e3),
        Some('M' | 'm') => (&cleaned[..cleaned.len() - 1], 1e6),
        Some('B' | 'b') => (&cleaned[..cleaned.len() - 1], 1e9),
        Some('T' | 't') => (&cleaned[..cleaned.len() - 1], 1e12),
        _ => (cleaned.as_str(), 1.0),
    };

    let number: f64 = digits.trim().parse().ok()?;
    number.is_finite().then_some(number * scale)
}

/// Decode a field value to text, if it is a non-blank string or a number.
pub fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
