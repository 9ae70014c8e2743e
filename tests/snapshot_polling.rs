//! Prime-then-poll behavior against a scripted gateway.

use ibkr_readonly::fields::{FUNDAMENTAL_FIELDS, LAST_PRICE, MARKET_CAP, QUOTE_FIELDS};
use ibkr_readonly::mock::ScriptedGateway;
use ibkr_readonly::snapshot::SNAPSHOT_PATH;
use ibkr_readonly::{
    Conid, GatewayError, PollSettings, ReadOnlyClient, Snapshot, SnapshotRequest, poll_snapshot,
};
use serde_json::json;

const AAPL: Conid = Conid(265598);

fn client(gateway: ScriptedGateway) -> ReadOnlyClient<ScriptedGateway> {
    ReadOnlyClient::new(gateway, "U1234567").with_poll_settings(PollSettings::immediate(3))
}

// ============================================================================
// Quote polling
// ============================================================================

#[test]
fn quote_ready_on_second_attempt() {
    let gateway = ScriptedGateway::builder()
        .respond(SNAPSHOT_PATH, json!({}))
        .respond(SNAPSHOT_PATH, json!([{"31": null}]))
        .respond(
            SNAPSHOT_PATH,
            json!([{
                "31": "189.50", "84": "189.40", "86": "189.60",
                "87": "1000000", "82": "1.2", "83": "0.6%"
            }]),
        )
        .build();

    let client = client(gateway);
    let quote = client.quote(AAPL).unwrap().expect("quote should be ready");

    assert_eq!(quote.conid, AAPL);
    assert_eq!(quote.last_price, 189.50);
    assert_eq!(quote.bid, 189.40);
    assert_eq!(quote.ask, 189.60);
    assert_eq!(quote.volume, 1_000_000);
    assert_eq!(quote.change, 1.2);
    assert_eq!(quote.change_pct, 0.6);

    // priming + two polls
    assert_eq!(client.gateway().calls_to(SNAPSHOT_PATH), 3);
}

#[test]
fn quote_requests_quote_fields() {
    let gateway = ScriptedGateway::builder()
        .respond(SNAPSHOT_PATH, json!([{"31": "10"}]))
        .build();
    let client = client(gateway);
    client.quote(AAPL).unwrap();

    let calls = client.gateway().calls();
    let expected = QUOTE_FIELDS.join(",");
    for call in &calls {
        assert_eq!(call.param("conids"), Some("265598"));
        assert_eq!(call.param("fields"), Some(expected.as_str()));
    }
}

#[test]
fn quote_not_ready_is_none_not_error() {
    let gateway = ScriptedGateway::builder()
        .respond(SNAPSHOT_PATH, json!([{"84": "1.0"}]))
        .build();
    let client = client(gateway);

    assert_eq!(client.quote(AAPL).unwrap(), None);
    assert_eq!(client.gateway().calls_to(SNAPSHOT_PATH), 4);
}

#[test]
fn change_pct_accepts_plain_number() {
    let gateway = ScriptedGateway::builder()
        .respond(SNAPSHOT_PATH, json!([{"31": 50.0, "83": -1.25, "55": "MSFT"}]))
        .build();
    let quote = client(gateway).quote(Conid(272093)).unwrap().unwrap();
    assert_eq!(quote.change_pct, -1.25);
    assert_eq!(quote.symbol, "MSFT");
}

// ============================================================================
// Fundamentals polling
// ============================================================================

#[test]
fn fundamentals_exhausted_is_none() {
    let gateway = ScriptedGateway::builder()
        .respond(SNAPSHOT_PATH, json!([{"7290": "30.1"}]))
        .build();
    let client = client(gateway);

    assert_eq!(client.fundamentals(AAPL).unwrap(), None);
    assert_eq!(client.gateway().calls_to(SNAPSHOT_PATH), 4);
    // metadata is only looked up once the snapshot is ready
    assert_eq!(client.gateway().calls_to("/iserver/contract/265598/info"), 0);
}

#[test]
fn fundamentals_merge_contract_metadata() {
    let gateway = ScriptedGateway::builder()
        .respond(SNAPSHOT_PATH, json!({}))
        .respond(
            SNAPSHOT_PATH,
            json!([{
                "7289": "2.5T", "7290": "30.5", "7291": "6.1",
                "7293": "199.62", "7294": "164.08", "7282": "55.3M"
            }]),
        )
        .respond(
            "/iserver/contract/265598/info",
            json!({
                "con_id": 265598, "symbol": "AAPL", "company_name": "APPLE INC",
                "industry": "Computers", "category": "Computers"
            }),
        )
        .build();

    let f = client(gateway).fundamentals(AAPL).unwrap().unwrap();
    assert_eq!(f.symbol, "AAPL");
    assert_eq!(f.company_name, "APPLE INC");
    assert_eq!(f.industry, "Computers");
    assert_eq!(f.market_cap, Some(2.5e12));
    assert_eq!(f.pe_ratio, Some(30.5));
    assert_eq!(f.eps, Some(6.1));
    // no dividend yield in the payload: absent, and it did not block readiness
    assert_eq!(f.dividend_yield, None);
    assert_eq!(f.high_52w, Some(199.62));
    assert_eq!(f.low_52w, Some(164.08));
}

#[test]
fn fundamentals_survive_null_metadata() {
    let gateway = ScriptedGateway::builder()
        .respond(SNAPSHOT_PATH, json!([{"7289": "1.2B", "7290": "18.4"}]))
        .respond(
            "/iserver/contract/1/info",
            json!({"con_id": 1, "symbol": "XYZ", "industry": null, "category": null}),
        )
        .build();

    let f = client(gateway).fundamentals(Conid(1)).unwrap().unwrap();
    assert_eq!(f.symbol, "XYZ");
    assert_eq!(f.industry, "");
    assert_eq!(f.category, "");
    assert_eq!(f.market_cap, Some(1.2e9));
    assert_eq!(f.pe_ratio, Some(18.4));
}

// ============================================================================
// Generic protocol
// ============================================================================

#[test]
fn call_count_is_priming_plus_attempts_until_ready() {
    for ready_at in 1..=5u32 {
        let mut builder = ScriptedGateway::builder().respond(SNAPSHOT_PATH, json!({}));
        for _ in 1..ready_at {
            builder = builder.respond(SNAPSHOT_PATH, json!([{"7289": ""}]));
        }
        let gateway = builder
            .respond(SNAPSHOT_PATH, json!([{"7289": "1B"}]))
            .build();

        let request = SnapshotRequest::new(AAPL, FUNDAMENTAL_FIELDS);
        let snapshot =
            poll_snapshot(&gateway, &request, MARKET_CAP, &PollSettings::immediate(5)).unwrap();

        assert!(snapshot.is_ready(), "ready_at={ready_at}");
        assert_eq!(gateway.calls_to(SNAPSHOT_PATH), 1 + ready_at as usize);
    }
}

#[test]
fn ready_after_budget_is_not_seen() {
    let gateway = ScriptedGateway::builder()
        .respond(SNAPSHOT_PATH, json!({}))
        .respond(SNAPSHOT_PATH, json!([]))
        .respond(SNAPSHOT_PATH, json!([]))
        .respond(SNAPSHOT_PATH, json!([{"31": "1.0"}]))
        .build();

    let request = SnapshotRequest::new(AAPL, &[LAST_PRICE]);
    let snapshot =
        poll_snapshot(&gateway, &request, LAST_PRICE, &PollSettings::immediate(2)).unwrap();

    assert_eq!(snapshot, Snapshot::NotReady { attempts: 2 });
    assert_eq!(gateway.calls_to(SNAPSHOT_PATH), 3);
}

#[test]
fn gateway_failure_mid_poll_is_an_error() {
    let gateway = ScriptedGateway::builder()
        .respond(SNAPSHOT_PATH, json!({}))
        .status(SNAPSHOT_PATH, 503)
        .build();

    let request = SnapshotRequest::new(AAPL, &[LAST_PRICE]);
    let result = poll_snapshot(&gateway, &request, LAST_PRICE, &PollSettings::immediate(3));
    assert!(matches!(result, Err(GatewayError::Status { status: 503, .. })));
}
