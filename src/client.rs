//! Read-only facade over a [`Gateway`]: session, accounts, portfolio,
//! market data, fundamentals, history and the scanner.
//!
//! No method here places, modifies or cancels an order, and the transport
//! refuses such paths as well.

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::fields;
use crate::gateway::Gateway;
use crate::history::{self, Bar, HistoryRequest};
use crate::scanner::{SCANNER_PATH, ScannerFilter};
use crate::snapshot::{PollSettings, Snapshot, SnapshotRequest, poll_snapshot};
use crate::types::{
    AccountInfo, AccountSummary, AuthStatus, Conid, ContractInfo, Fundamentals, Position,
    PositionEntry, Quote,
};

pub const AUTH_STATUS_PATH: &str = "/iserver/auth/status";
pub const TICKLE_PATH: &str = "/tickle";
pub const ACCOUNTS_PATH: &str = "/portfolio/accounts";
pub const SEARCH_PATH: &str = "/iserver/secdef/search";

/// Entries per page of the positions endpoint.
pub const POSITIONS_PAGE_SIZE: usize = 100;

/// Hard stop for position paging.
const MAX_POSITION_PAGES: u32 = 50;

/// Read-only client. Owns one gateway session; not meant for sharing
/// across threads.
pub struct ReadOnlyClient<G: Gateway> {
    gateway: G,
    account_id: String,
    poll: PollSettings,
}

impl<G: Gateway> ReadOnlyClient<G> {
    pub fn new(gateway: G, account_id: &str) -> Self {
        Self {
            gateway,
            account_id: account_id.trim().to_string(),
            poll: PollSettings::default(),
        }
    }

    /// Replace the snapshot polling cadence.
    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn set_account_id(&mut self, account_id: &str) {
        self.account_id = account_id.trim().to_string();
    }

    pub fn poll_settings(&self) -> &PollSettings {
        &self.poll
    }

    fn require_account(&self) -> Result<&str, GatewayError> {
        if self.account_id.is_empty() {
            Err(GatewayError::NoAccount)
        } else {
            Ok(&self.account_id)
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Session state. Never fails: transport problems become `Unreachable`.
    pub fn auth_status(&self) -> AuthStatus {
        match self.gateway.get(AUTH_STATUS_PATH, &[]) {
            Ok(status) => {
                if status.get("authenticated").and_then(Value::as_bool) == Some(true) {
                    AuthStatus::Authenticated
                } else {
                    AuthStatus::NotAuthenticated
                }
            }
            Err(e) if e.is_unauthorized() => AuthStatus::NotAuthenticated,
            Err(e) => {
                warn!("Auth status check failed: {e}");
                AuthStatus::Unreachable(e.to_string())
            }
        }
    }

    /// Fails closed: anything but a confirmed session is `false`.
    pub fn is_authenticated(&self) -> bool {
        self.auth_status().is_authenticated()
    }

    /// Ping the session to keep it alive, then report its state.
    pub fn keepalive(&self) -> AuthStatus {
        if let Err(e) = self.gateway.post(TICKLE_PATH, &json!({})) {
            warn!("Keepalive failed: {e}");
            return AuthStatus::Unreachable(e.to_string());
        }
        self.auth_status()
    }

    // ========================================================================
    // Accounts & portfolio
    // ========================================================================

    pub fn accounts(&self) -> Result<Vec<AccountInfo>, GatewayError> {
        let data = self.gateway.get(ACCOUNTS_PATH, &[])?;
        let accounts = decode_list::<AccountInfo>(ACCOUNTS_PATH, &data);
        info!("Fetched {} accounts", accounts.len());
        Ok(accounts)
    }

    /// Select the first account the gateway lists. Returns its id.
    pub fn select_first_account(&mut self) -> Result<Option<String>, GatewayError> {
        let first = self.accounts()?.into_iter().next().map(|a| a.id);
        if let Some(id) = &first {
            self.set_account_id(id);
        }
        Ok(first)
    }

    pub fn account_summary(&self) -> Result<AccountSummary, GatewayError> {
        let account = self.require_account()?;
        let data = self
            .gateway
            .get(&format!("/portfolio/{account}/summary"), &[])?;
        let summary = AccountSummary::from_value(&data);
        info!(
            "Account {account}: net liquidation {:.2}, cash {:.2}",
            summary.net_liquidation, summary.cash
        );
        Ok(summary)
    }

    /// All positions, walking the paged endpoint until a short page.
    pub fn positions(&self) -> Result<Vec<Position>, GatewayError> {
        let account = self.require_account()?;
        let mut positions = Vec::new();

        for page in 0..MAX_POSITION_PAGES {
            let path = format!("/portfolio/{account}/positions/{page}");
            let data = self.gateway.get(&path, &[])?;
            // A page is short by its raw length; malformed entries still count.
            let count = data.as_array().map_or(0, Vec::len);
            let entries = decode_list::<PositionEntry>(&path, &data);
            debug!("Positions page {page}: {count} entries, {} decoded", entries.len());

            positions.extend(entries.into_iter().map(Position::from));
            if count < POSITIONS_PAGE_SIZE {
                break;
            }
        }

        info!("Fetched {} positions", positions.len());
        Ok(positions)
    }

    // ========================================================================
    // Instruments & market data
    // ========================================================================

    /// Resolve a ticker to the first matching conid. Single shot.
    pub fn search_symbol(&self, symbol: &str) -> Result<Option<Conid>, GatewayError> {
        let data = self
            .gateway
            .get(SEARCH_PATH, &[("symbol", symbol.trim())])?;
        let conid = data
            .as_array()
            .and_then(|matches| matches.first())
            .and_then(|first| first.get("conid"))
            .and_then(Conid::from_value);
        debug!("search {symbol}: {conid:?}");
        Ok(conid)
    }

    /// Poll a snapshot with this client's settings.
    pub fn snapshot(
        &self,
        request: &SnapshotRequest,
        primary_field: &str,
    ) -> Result<Snapshot, GatewayError> {
        poll_snapshot(&self.gateway, request, primary_field, &self.poll)
    }

    /// Live quote, or `None` when no last price arrived within the budget.
    pub fn quote(&self, conid: Conid) -> Result<Option<Quote>, GatewayError> {
        let request = SnapshotRequest::new(conid, fields::QUOTE_FIELDS);
        let snapshot = self.snapshot(&request, fields::LAST_PRICE)?;
        Ok(snapshot
            .into_fields()
            .map(|f| Quote::from_snapshot(conid, &f)))
    }

    /// Search, then quote. `None` if the symbol is unknown or not ready.
    pub fn quote_for_symbol(&self, symbol: &str) -> Result<Option<Quote>, GatewayError> {
        let Some(conid) = self.search_symbol(symbol)? else {
            return Ok(None);
        };
        let quote = self.quote(conid)?.map(|mut q| {
            if q.symbol.is_empty() {
                q.symbol = symbol.trim().to_string();
            }
            q
        });
        Ok(quote)
    }

    /// Quotes for several symbols, in input order. Failures are skipped.
    pub fn quotes_batch(&self, symbols: &[&str]) -> Vec<(String, Quote)> {
        let mut quotes = Vec::with_capacity(symbols.len());
        for &symbol in symbols {
            match self.quote_for_symbol(symbol) {
                Ok(Some(quote)) => quotes.push((symbol.to_string(), quote)),
                Ok(None) => warn!("No quote for {symbol}"),
                Err(e) => warn!("Quote for {symbol} failed: {e}"),
            }
        }
        quotes
    }

    pub fn contract_info(&self, conid: Conid) -> Result<ContractInfo, GatewayError> {
        let path = format!("/iserver/contract/{conid}/info");
        let data = self.gateway.get(&path, &[])?;
        serde_json::from_value(data).map_err(|e| GatewayError::Decode {
            path,
            message: e.to_string(),
        })
    }

    /// Fundamentals, or `None` when market cap never arrived.
    pub fn fundamentals(&self, conid: Conid) -> Result<Option<Fundamentals>, GatewayError> {
        let request = SnapshotRequest::new(conid, fields::FUNDAMENTAL_FIELDS);
        let Some(snapshot) = self.snapshot(&request, fields::MARKET_CAP)?.into_fields() else {
            return Ok(None);
        };
        let info = self.contract_info(conid)?;
        Ok(Some(Fundamentals::from_snapshot(conid, &snapshot, &info)))
    }

    pub fn history(&self, request: &HistoryRequest) -> Result<Vec<Bar>, GatewayError> {
        let params = request.query_params();
        let query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let data = self.gateway.get(history::HISTORY_PATH, &query)?;
        let bars = history::decode_bars(&data);
        info!("Fetched {} bars for conid {}", bars.len(), request.conid);
        Ok(bars)
    }

    /// Run the scanner; the raw response is returned untouched.
    pub fn scan(&self, filter: &ScannerFilter) -> Result<Value, GatewayError> {
        self.gateway.post(SCANNER_PATH, &filter.to_body())
    }
}

/// Decode each element of a JSON array, skipping (and logging) bad ones.
/// Anything that is not an array decodes to nothing.
fn decode_list<T: serde::de::DeserializeOwned>(path: &str, data: &Value) -> Vec<T> {
    let Some(entries) = data.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping malformed entry from {path}: {e}");
                None
            }
        })
        .collect()
}
