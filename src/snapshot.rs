//! Prime-then-poll market-data snapshots.
//!
//! The first snapshot request for an instrument only starts a market-data
//! subscription on the gateway and comes back stale or empty. Values show
//! up on later requests, so [`poll_snapshot`] sends one priming request,
//! waits for the subscription to warm up, then re-requests until the
//! primary field carries a value or the attempt budget is spent.
//!
//! Each snapshot kind has its own primary field (last price for quotes,
//! market cap for fundamentals). Optional fields such as dividend yield
//! never block readiness.

use std::thread;
use std::time::Duration;

use log::{debug, info};
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::fields::{self, is_present};
use crate::gateway::Gateway;
use crate::types::Conid;

/// Snapshot endpoint. Also the subscribe call.
pub const SNAPSHOT_PATH: &str = "/iserver/marketdata/snapshot";

/// Polling cadence for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Polls after the priming request.
    pub max_attempts: u32,
    /// Sleep between the priming request and the first poll.
    pub warmup_delay: Duration,
    /// Sleep between unsuccessful polls.
    pub retry_delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            warmup_delay: Duration::from_millis(1000),
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl PollSettings {
    /// No sleeping at all.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            warmup_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
        }
    }
}

/// One instrument, a set of field codes, and an optional period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    conid: Conid,
    fields: Vec<String>,
    period: Option<String>,
}

impl SnapshotRequest {
    pub fn new(conid: Conid, fields: &[&str]) -> Self {
        Self {
            conid,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            period: None,
        }
    }

    /// Attach a period (e.g. `"1d"`); forwarded verbatim as `period=`.
    pub fn with_period(mut self, period: &str) -> Self {
        self.period = Some(period.to_string());
        self
    }

    pub fn conid(&self) -> Conid {
        self.conid
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }

    /// Query parameters, identical for every request of a poll.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("conids", self.conid.to_string()),
            ("fields", self.fields.join(",")),
        ];
        if let Some(period) = &self.period {
            params.push(("period", period.clone()));
        }
        params
    }
}

/// Field code → raw value for one instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotFields(Map<String, Value>);

impl SnapshotFields {
    pub fn get(&self, code: &str) -> Option<&Value> {
        self.0.get(code)
    }

    /// True if the field carries a non-empty value.
    pub fn has(&self, code: &str) -> bool {
        self.get(code).is_some_and(is_present)
    }

    pub fn number(&self, code: &str) -> Option<f64> {
        self.get(code).and_then(fields::parse_number)
    }

    pub fn text(&self, code: &str) -> Option<String> {
        self.get(code).and_then(fields::parse_text)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for SnapshotFields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Result of a poll: data, or the definite answer "no live data yet".
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Ready(SnapshotFields),
    NotReady { attempts: u32 },
}

impl Snapshot {
    pub fn is_ready(&self) -> bool {
        matches!(self, Snapshot::Ready(_))
    }

    pub fn into_fields(self) -> Option<SnapshotFields> {
        match self {
            Snapshot::Ready(fields) => Some(fields),
            Snapshot::NotReady { .. } => None,
        }
    }
}

/// First entry of a snapshot response, if its primary field is filled.
pub fn ready_entry(response: &Value, primary_field: &str) -> Option<SnapshotFields> {
    let entry = response.as_array()?.first()?.as_object()?;
    if !entry.get(primary_field).is_some_and(is_present) {
        return None;
    }
    Some(SnapshotFields(entry.clone()))
}

/// Prime, warm up, then poll up to `settings.max_attempts` times.
///
/// Issues exactly one priming call plus at most `max_attempts` polls.
/// Running out of attempts is `Ok(Snapshot::NotReady)`; only transport and
/// decode failures are errors.
pub fn poll_snapshot<G: Gateway + ?Sized>(
    gateway: &G,
    request: &SnapshotRequest,
    primary_field: &str,
    settings: &PollSettings,
) -> Result<Snapshot, GatewayError> {
    let params = request.query_params();
    let query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

    gateway.get(SNAPSHOT_PATH, &query)?;
    debug!(
        "Primed snapshot for conid {} (fields {})",
        request.conid,
        request.fields.join(",")
    );
    pause(settings.warmup_delay);

    for attempt in 1..=settings.max_attempts {
        let response = gateway.get(SNAPSHOT_PATH, &query)?;
        if let Some(fields) = ready_entry(&response, primary_field) {
            info!(
                "Snapshot for conid {} ready after {attempt} attempt(s)",
                request.conid
            );
            return Ok(Snapshot::Ready(fields));
        }

        debug!(
            "conid {}: field {primary_field} empty (attempt {attempt}/{})",
            request.conid, settings.max_attempts
        );
        if attempt < settings.max_attempts {
            pause(settings.retry_delay);
        }
    }

    info!(
        "No data for conid {} after {} attempts",
        request.conid, settings.max_attempts
    );
    Ok(Snapshot::NotReady {
        attempts: settings.max_attempts,
    })
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{LAST_PRICE, QUOTE_FIELDS};
    use crate::mock::ScriptedGateway;
    use serde_json::json;

    fn request() -> SnapshotRequest {
        SnapshotRequest::new(Conid(265598), &[LAST_PRICE, "84"])
    }

    #[test]
    fn query_params_join_fields() {
        let params = SnapshotRequest::new(Conid(7), QUOTE_FIELDS).query_params();
        assert_eq!(params[0], ("conids", "7".to_string()));
        assert_eq!(params[1], ("fields", "31,84,86,87,88,82,83,55".to_string()));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn period_is_forwarded() {
        let params = request().with_period("1d").query_params();
        assert_eq!(params.last(), Some(&("period", "1d".to_string())));
    }

    #[test]
    fn ready_entry_requires_primary() {
        assert!(ready_entry(&json!({}), LAST_PRICE).is_none());
        assert!(ready_entry(&json!([]), LAST_PRICE).is_none());
        assert!(ready_entry(&json!([{"31": null}]), LAST_PRICE).is_none());
        assert!(ready_entry(&json!([{"31": ""}]), LAST_PRICE).is_none());
        assert!(ready_entry(&json!([{"84": "1.0"}]), LAST_PRICE).is_none());
        assert!(ready_entry(&json!([{"31": "1.0"}]), LAST_PRICE).is_some());
    }

    #[test]
    fn ready_on_first_poll() {
        let gateway = ScriptedGateway::builder()
            .respond(SNAPSHOT_PATH, json!({}))
            .respond(SNAPSHOT_PATH, json!([{"31": "10.0"}]))
            .build();

        let snapshot =
            poll_snapshot(&gateway, &request(), LAST_PRICE, &PollSettings::immediate(3)).unwrap();
        assert!(snapshot.is_ready());
        assert_eq!(gateway.calls_to(SNAPSHOT_PATH), 2);
    }

    #[test]
    fn exhausted_budget_is_not_ready() {
        let gateway = ScriptedGateway::builder()
            .respond(SNAPSHOT_PATH, json!([{"31": null}]))
            .build();

        let snapshot =
            poll_snapshot(&gateway, &request(), LAST_PRICE, &PollSettings::immediate(4)).unwrap();
        assert_eq!(snapshot, Snapshot::NotReady { attempts: 4 });
        assert_eq!(gateway.calls_to(SNAPSHOT_PATH), 5);
    }

    #[test]
    fn zero_attempts_only_primes() {
        let gateway = ScriptedGateway::builder()
            .respond(SNAPSHOT_PATH, json!([{"31": "10.0"}]))
            .build();

        let snapshot =
            poll_snapshot(&gateway, &request(), LAST_PRICE, &PollSettings::immediate(0)).unwrap();
        assert!(!snapshot.is_ready());
        assert_eq!(gateway.calls_to(SNAPSHOT_PATH), 1);
    }

    #[test]
    fn priming_response_is_ignored_even_if_full() {
        let gateway = ScriptedGateway::builder()
            .respond(SNAPSHOT_PATH, json!([{"31": "stale"}]))
            .respond(SNAPSHOT_PATH, json!([{"31": "12.5"}]))
            .build();

        let fields = poll_snapshot(&gateway, &request(), LAST_PRICE, &PollSettings::immediate(1))
            .unwrap()
            .into_fields()
            .unwrap();
        assert_eq!(fields.number(LAST_PRICE), Some(12.5));
    }

    #[test]
    fn transport_error_propagates() {
        let gateway = ScriptedGateway::builder()
            .fail(SNAPSHOT_PATH, "connection refused")
            .build();

        let result = poll_snapshot(&gateway, &request(), LAST_PRICE, &PollSettings::immediate(3));
        assert!(matches!(result, Err(GatewayError::Connection(_))));
        assert_eq!(gateway.calls_to(SNAPSHOT_PATH), 1);
    }

    #[test]
    fn warmup_delay_is_honored() {
        let gateway = ScriptedGateway::builder()
            .respond(SNAPSHOT_PATH, json!([{"31": "1"}]))
            .build();
        let settings = PollSettings {
            max_attempts: 1,
            warmup_delay: Duration::from_millis(60),
            retry_delay: Duration::ZERO,
        };

        let start = std::time::Instant::now();
        poll_snapshot(&gateway, &request(), LAST_PRICE, &settings).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
