//! Historical OHLCV bars.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Conid;

pub const HISTORY_PATH: &str = "/iserver/marketdata/history";

/// Which bars to fetch: `period` is the lookback (`1d`, `1w`, `1m`, `1y`),
/// `bar` the bar size (`1min`, `5min`, `1h`, `1d`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub conid: Conid,
    pub period: String,
    pub bar: String,
}

impl HistoryRequest {
    pub fn new(conid: Conid, period: &str, bar: &str) -> Self {
        Self {
            conid,
            period: period.to_string(),
            bar: bar.to_string(),
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("conid", self.conid.to_string()),
            ("period", self.period.clone()),
            ("bar", self.bar.clone()),
        ]
    }
}

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Wire format: `{"t": <epoch ms>, "o": .., "h": .., "l": .., "c": .., "v": ..}`.
#[derive(Debug, Deserialize)]
struct RawBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    #[serde(default)]
    v: f64,
}

/// Decode the `data` array of a history response, oldest bar first.
///
/// Malformed bars are skipped with a warning.
pub fn decode_bars(response: &Value) -> Vec<Bar> {
    let Some(data) = response.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut bars: Vec<Bar> = data
        .iter()
        .filter_map(|entry| {
            let raw: RawBar = match serde_json::from_value(entry.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping malformed bar {entry}: {e}");
                    return None;
                }
            };
            let Some(time) = DateTime::from_timestamp_millis(raw.t) else {
                warn!("Skipping bar with out-of-range timestamp {}", raw.t);
                return None;
            };
            Some(Bar {
                time,
                open: raw.o,
                high: raw.h,
                low: raw.l,
                close: raw.c,
                volume: raw.v,
            })
        })
        .collect();

    bars.sort_by_key(|b| b.time);
    bars
}
