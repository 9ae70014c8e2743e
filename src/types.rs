//! Shared data model: instruments, quotes, fundamentals, positions, accounts.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::fields;
use crate::snapshot::SnapshotFields;

/// Backend-assigned instrument id ("conid").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Conid(pub i64);

impl Conid {
    /// Read a conid that may arrive as a JSON number or a numeric string.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Conid),
            Value::String(s) => s.trim().parse().ok().map(Conid),
            _ => None,
        }
    }
}

impl fmt::Display for Conid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a session check. Only `Authenticated` counts as logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated,
    NotAuthenticated,
    /// The gateway could not be reached or answered garbage.
    Unreachable(String),
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated)
    }
}

/// Live quote decoded from a ready snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub conid: Conid,
    pub symbol: String,
    pub last_price: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume: u64,
    pub close: f64,
    pub change: f64,
    pub change_pct: f64,
}

impl Quote {
    /// Decode quote fields. Missing numeric fields read as zero.
    pub fn from_snapshot(conid: Conid, snapshot: &SnapshotFields) -> Self {
        let num = |code: &str| snapshot.number(code).unwrap_or(0.0);
        let symbol = snapshot
            .text(fields::SYMBOL)
            .or_else(|| snapshot.text("symbol"))
            .unwrap_or_default();

        Self {
            conid,
            symbol,
            last_price: num(fields::LAST_PRICE),
            bid: num(fields::BID),
            ask: num(fields::ASK),
            volume: num(fields::VOLUME).max(0.0) as u64,
            close: num(fields::CLOSE),
            change: num(fields::CHANGE),
            change_pct: num(fields::CHANGE_PCT),
        }
    }

    /// Bid/ask spread, if both sides are quoted.
    pub fn spread(&self) -> Option<f64> {
        (self.bid > 0.0 && self.ask > 0.0).then(|| self.ask - self.bid)
    }
}

/// Contract metadata from `/iserver/contract/{conid}/info`.
///
/// Missing or `null` labels (common for ETFs and indices) read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractInfo {
    #[serde(rename = "con_id", deserialize_with = "null_as_default")]
    pub conid: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub industry: String,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub exchange: String,
    #[serde(deserialize_with = "null_as_default")]
    pub currency: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fundamentals: snapshot metrics merged with contract metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fundamentals {
    pub conid: Conid,
    pub symbol: String,
    pub company_name: String,
    pub industry: String,
    pub category: String,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
    pub avg_volume: Option<f64>,
}

impl Fundamentals {
    pub fn from_snapshot(conid: Conid, snapshot: &SnapshotFields, info: &ContractInfo) -> Self {
        Self {
            conid,
            symbol: info.symbol.clone(),
            company_name: info.company_name.clone(),
            industry: info.industry.clone(),
            category: info.category.clone(),
            market_cap: snapshot.number(fields::MARKET_CAP),
            pe_ratio: snapshot.number(fields::PE_RATIO),
            eps: snapshot.number(fields::EPS),
            dividend_yield: snapshot.number(fields::DIVIDEND_YIELD),
            high_52w: snapshot.number(fields::HIGH_52W),
            low_52w: snapshot.number(fields::LOW_52W),
            avg_volume: snapshot.number(fields::AVG_VOLUME),
        }
    }
}

/// P&L as a percentage of cost basis (`avg_cost * quantity`).
///
/// Zero when the cost basis is zero.
pub fn pnl_percent(unrealized_pnl: f64, avg_cost: f64, quantity: f64) -> f64 {
    let cost_basis = avg_cost * quantity;
    if cost_basis == 0.0 {
        0.0
    } else {
        unrealized_pnl / cost_basis * 100.0
    }
}

/// A portfolio position. `pnl_percent` is always derived locally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub conid: Conid,
    pub symbol: String,
    /// Positive = long, negative = short.
    pub quantity: f64,
    pub avg_cost: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub pnl_percent: f64,
}

impl Position {
    pub fn new(
        conid: Conid,
        symbol: &str,
        quantity: f64,
        avg_cost: f64,
        market_value: f64,
        unrealized_pnl: f64,
    ) -> Self {
        Self {
            conid,
            symbol: symbol.to_string(),
            quantity,
            avg_cost,
            market_value,
            unrealized_pnl,
            pnl_percent: pnl_percent(unrealized_pnl, avg_cost, quantity),
        }
    }

    pub fn cost_basis(&self) -> f64 {
        self.avg_cost * self.quantity
    }
}

/// Raw entry of `/portfolio/{acct}/positions/{page}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionEntry {
    pub conid: Option<i64>,
    pub contract_desc: Option<String>,
    pub ticker: Option<String>,
    pub position: Option<f64>,
    pub avg_cost: Option<f64>,
    pub mkt_value: Option<f64>,
    pub unrealized_pnl: Option<f64>,
}

impl From<PositionEntry> for Position {
    fn from(entry: PositionEntry) -> Self {
        let symbol = entry
            .contract_desc
            .filter(|s| !s.is_empty())
            .or(entry.ticker)
            .unwrap_or_default();

        Position::new(
            Conid(entry.conid.unwrap_or(0)),
            &symbol,
            entry.position.unwrap_or(0.0),
            entry.avg_cost.unwrap_or(0.0),
            entry.mkt_value.unwrap_or(0.0),
            entry.unrealized_pnl.unwrap_or(0.0),
        )
    }
}

/// Entry of `/portfolio/accounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountInfo {
    #[serde(rename = "accountId")]
    pub id: String,
    #[serde(rename = "desc")]
    pub description: String,
    pub currency: String,
    #[serde(rename = "type")]
    pub account_type: String,
}

/// Balances from `/portfolio/{acct}/summary`. Missing keys read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountSummary {
    pub cash: f64,
    pub net_liquidation: f64,
    pub buying_power: f64,
    pub gross_position_value: f64,
    pub available_funds: f64,
    pub currency: String,
}

impl AccountSummary {
    /// Decode the gateway's `{"<key>": {"amount": .., "currency": ..}}` map.
    pub fn from_value(value: &Value) -> Self {
        let amount = |key: &str| {
            value
                .get(key)
                .and_then(|entry| entry.get("amount"))
                .and_then(fields::parse_number)
                .unwrap_or(0.0)
        };
        let currency = value
            .get("netliquidation")
            .and_then(|entry| entry.get("currency"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            cash: amount("totalcashvalue"),
            net_liquidation: amount("netliquidation"),
            buying_power: amount("buyingpower"),
            gross_position_value: amount("grosspositionvalue"),
            available_funds: amount("availablefunds"),
            currency,
        }
    }
}
