//! Command orchestration: session check → account → fetch → render.
//!
//! Generic over [`Gateway`] so every command runs against the scripted
//! gateway in tests exactly as it does against the live one.

use ibkr_readonly::news::NewsFeed;
use ibkr_readonly::{
    AuthStatus, Gateway, GatewayConfig, GatewayError, HistoryRequest, HttpGateway,
    ReadOnlyClient, ScannerFilter,
};
use log::{info, warn};
use serde::Serialize;

use crate::config::{Config, Overrides};
use crate::error::{Error, Result};
use crate::report;

/// Output style of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

fn emit<T: Serialize + ?Sized>(
    format: Format,
    data: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<String> {
    match format {
        Format::Text => Ok(text(data)),
        Format::Json => Ok(serde_json::to_string_pretty(data)?),
    }
}

/// Build a client for the live gateway from config, environment and flags.
pub fn connect(config: &Config, overrides: &Overrides) -> Result<ReadOnlyClient<HttpGateway>> {
    let gateway_config = config.gateway_config(GatewayConfig::from_env(), overrides);
    info!("Using gateway at {}", gateway_config.base_url);

    let gateway = HttpGateway::new(&gateway_config)?;
    Ok(ReadOnlyClient::new(gateway, &gateway_config.account_id)
        .with_poll_settings(config.poll_settings()))
}

/// Headline fetcher for the configured feed.
pub fn news_feed(config: &Config) -> Result<NewsFeed> {
    Ok(NewsFeed::new(&config.news.feed_url, config.news_timeout())?)
}

/// Fail unless the gateway confirms an authenticated session.
pub fn require_session<G: Gateway>(client: &ReadOnlyClient<G>) -> Result<()> {
    match client.auth_status() {
        AuthStatus::Authenticated => Ok(()),
        AuthStatus::NotAuthenticated => Err(Error::NotAuthenticated("login required".into())),
        AuthStatus::Unreachable(reason) => Err(Error::NotAuthenticated(reason)),
    }
}

/// Fall back to the first listed account when none is configured.
pub fn ensure_account<G: Gateway>(client: &mut ReadOnlyClient<G>) -> Result<()> {
    if !client.account_id().is_empty() {
        return Ok(());
    }
    match client.select_first_account()? {
        Some(id) => {
            info!("No account configured, using {id}");
            Ok(())
        }
        None => Err(GatewayError::NoAccount.into()),
    }
}

/// Keep the session alive and report it.
pub fn status<G: Gateway>(client: &ReadOnlyClient<G>) -> Result<String> {
    let status = client.keepalive();
    let text = report::render_status(&status);
    if status.is_authenticated() {
        Ok(text)
    } else {
        Err(Error::NotAuthenticated(text))
    }
}

pub fn summary<G: Gateway>(client: &mut ReadOnlyClient<G>, format: Format) -> Result<String> {
    require_session(client)?;
    ensure_account(client)?;
    let summary = client.account_summary()?;
    let account = client.account_id().to_string();
    emit(format, &summary, |s| report::render_summary(&account, s))
}

pub fn positions<G: Gateway>(client: &mut ReadOnlyClient<G>, format: Format) -> Result<String> {
    require_session(client)?;
    ensure_account(client)?;
    let summary = client.account_summary()?;
    let positions = client.positions()?;
    emit(format, positions.as_slice(), |p| {
        report::render_positions(p, summary.net_liquidation)
    })
}

pub fn quotes<G: Gateway>(
    client: &ReadOnlyClient<G>,
    symbols: &[String],
    format: Format,
) -> Result<String> {
    require_session(client)?;
    let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let quotes = client.quotes_batch(&symbols);
    if quotes.len() < symbols.len() {
        warn!("{} of {} quotes unavailable", symbols.len() - quotes.len(), symbols.len());
    }
    emit(format, quotes.as_slice(), |q| report::render_quotes(q))
}

pub fn fundamentals<G: Gateway>(
    client: &ReadOnlyClient<G>,
    symbol: &str,
    format: Format,
) -> Result<String> {
    require_session(client)?;
    let conid = client
        .search_symbol(symbol)?
        .ok_or_else(|| Error::SymbolNotFound(symbol.to_string()))?;

    match client.fundamentals(conid)? {
        Some(f) => emit(format, &f, report::render_fundamentals),
        None => Ok(format!(
            "Fundamentals for {symbol} not available yet (data still loading). Try again."
        )),
    }
}

pub fn history<G: Gateway>(
    client: &ReadOnlyClient<G>,
    symbol: &str,
    period: &str,
    bar: &str,
    format: Format,
) -> Result<String> {
    require_session(client)?;
    let conid = client
        .search_symbol(symbol)?
        .ok_or_else(|| Error::SymbolNotFound(symbol.to_string()))?;
    let bars = client.history(&HistoryRequest::new(conid, period, bar))?;
    emit(format, bars.as_slice(), |b| report::render_bars(symbol, b))
}

pub fn scan<G: Gateway>(
    client: &ReadOnlyClient<G>,
    filter: &ScannerFilter,
    format: Format,
) -> Result<String> {
    require_session(client)?;
    let result = client.scan(filter)?;
    emit(format, &result, report::render_scanner)
}

/// Headlines per symbol. Feed failures show up as "no headlines".
pub fn news(feed: &NewsFeed, symbols: &[String], limit: usize, format: Format) -> Result<String> {
    let per_symbol: Vec<(String, Vec<_>)> = symbols
        .iter()
        .map(|s| (s.clone(), feed.headlines(s, limit)))
        .collect();

    emit(format, per_symbol.as_slice(), |all| {
        all.iter()
            .map(|(symbol, items)| report::render_headlines(symbol, items))
            .collect::<Vec<_>>()
            .join("\n\n")
    })
}
