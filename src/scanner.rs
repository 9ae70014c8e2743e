//! Market scanner request body.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const SCANNER_PATH: &str = "/iserver/scanner/run";

/// Scanner filter code for a market-cap floor, in millions of USD.
pub const MARKET_CAP_FILTER: &str = "marketCapAbove1e6";

/// Parameters of one scanner run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerFilter {
    pub instrument: String,
    pub scan_type: String,
    pub location: String,
    /// Minimum market cap, in millions.
    pub min_market_cap: f64,
}

impl Default for ScannerFilter {
    fn default() -> Self {
        Self {
            instrument: "STK".to_string(),
            scan_type: "MOST_ACTIVE".to_string(),
            location: "STK.US.MAJOR".to_string(),
            min_market_cap: 1_000.0,
        }
    }
}

impl ScannerFilter {
    /// JSON body for `POST /iserver/scanner/run`.
    pub fn to_body(&self) -> Value {
        json!({
            "instrument": self.instrument,
            "type": self.scan_type,
            "location": self.location,
            "filter": [
                { "code": MARKET_CAP_FILTER, "value": self.min_market_cap }
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_shape() {
        let filter = ScannerFilter {
            scan_type: "TOP_PERC_GAIN".into(),
            min_market_cap: 500.0,
            ..ScannerFilter::default()
        };
        assert_eq!(
            filter.to_body(),
            json!({
                "instrument": "STK",
                "type": "TOP_PERC_GAIN",
                "location": "STK.US.MAJOR",
                "filter": [{"code": "marketCapAbove1e6", "value": 500.0}]
            })
        );
    }
}
