//! # ibkr-readonly
//!
//! A read-only query client for the Interactive Brokers Client Portal
//! gateway: account balances, positions, market-data snapshots,
//! fundamentals, historical bars, the market scanner, and company
//! headlines from an RSS feed.
//!
//! Orders cannot be placed, modified or cancelled through this crate. The
//! client has no such methods, and every request path is checked by
//! [`gateway::ensure_read_only`] before it leaves the process.
//!
//! ## Snapshots
//!
//! The gateway answers the first snapshot request for an instrument with
//! stale or empty data while it subscribes in the background. Quotes and
//! fundamentals therefore go through [`snapshot::poll_snapshot`]: one
//! priming request, a warm-up pause, then a bounded number of polls until
//! the primary field (last price, market cap) is filled.
//!
//! ```
//! use ibkr_readonly::mock::ScriptedGateway;
//! use ibkr_readonly::{Conid, PollSettings, ReadOnlyClient};
//! use serde_json::json;
//!
//! let gateway = ScriptedGateway::builder()
//!     .respond("/iserver/marketdata/snapshot", json!({}))
//!     .respond("/iserver/marketdata/snapshot", json!([{"31": "189.50", "84": "189.40"}]))
//!     .build();
//!
//! let client = ReadOnlyClient::new(gateway, "U1234567")
//!     .with_poll_settings(PollSettings::immediate(3));
//! let quote = client.quote(Conid(265598)).unwrap().unwrap();
//! assert_eq!(quote.last_price, 189.50);
//! ```
//!
//! ## Talking to a real gateway
//!
//! ```no_run
//! use ibkr_readonly::{GatewayConfig, HttpGateway, ReadOnlyClient};
//!
//! let config = GatewayConfig::from_env();
//! let gateway = HttpGateway::new(&config)?;
//! let client = ReadOnlyClient::new(gateway, &config.account_id);
//! if client.is_authenticated() {
//!     for position in client.positions()? {
//!         println!("{} {:+.2}%", position.symbol, position.pnl_percent);
//!     }
//! }
//! # Ok::<(), ibkr_readonly::GatewayError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fields;
pub mod gateway;
pub mod history;
pub mod mock;
pub mod scanner;
pub mod snapshot;
pub mod types;

#[cfg(feature = "news")]
pub mod news;

pub use client::ReadOnlyClient;
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{Gateway, HttpGateway};
pub use history::{Bar, HistoryRequest};
pub use scanner::ScannerFilter;
pub use snapshot::{PollSettings, Snapshot, SnapshotFields, SnapshotRequest, poll_snapshot};
pub use types::*;

#[cfg(feature = "news")]
pub use news::{NewsFeed, NewsItem};
