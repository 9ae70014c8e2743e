//! Company headlines from a public RSS feed.
//!
//! Best-effort by nature: [`NewsFeed::headlines`] turns every failure into
//! an empty list. Callers that need to tell "no news" from "feed down" use
//! [`NewsFeed::fetch`].

use std::time::Duration;

use log::{debug, warn};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::blocking::Client;
use serde::Serialize;

use crate::error::GatewayError;

/// Yahoo Finance headline feed; `{symbol}` is substituted per request.
pub const DEFAULT_FEED_URL: &str =
    "https://feeds.finance.yahoo.com/rss/2.0/headline?s={symbol}&region=US&lang=en-US";

/// Default number of headlines per symbol.
pub const DEFAULT_LIMIT: usize = 5;

/// One headline. Missing parts are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub date: String,
    pub link: String,
}

#[derive(Clone, Copy)]
enum ItemField {
    Title,
    Date,
    Link,
}

/// Extract up to `limit` items from an RSS document.
pub fn parse_rss(xml: &str, limit: usize) -> Result<Vec<NewsItem>, GatewayError> {
    let mut items = Vec::new();
    if limit == 0 {
        return Ok(items);
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<NewsItem> = None;
    let mut field: Option<ItemField> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" => current = Some(NewsItem::default()),
                b"title" => field = Some(ItemField::Title),
                b"pubDate" => field = Some(ItemField::Date),
                b"link" => field = Some(ItemField::Link),
                _ => field = None,
            },
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| GatewayError::Feed(format!("bad text in feed: {e}")))?;
                append(current.as_mut(), field, &text);
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                append(current.as_mut(), field, &text);
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        items.push(item);
                        if items.len() >= limit {
                            break;
                        }
                    }
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(GatewayError::Feed(format!(
                    "malformed feed at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    Ok(items)
}

fn append(item: Option<&mut NewsItem>, field: Option<ItemField>, text: &str) {
    let (Some(item), Some(field)) = (item, field) else {
        return;
    };
    let target = match field {
        ItemField::Title => &mut item.title,
        ItemField::Date => &mut item.date,
        ItemField::Link => &mut item.link,
    };
    target.push_str(text.trim());
}

/// RSS headline fetcher with its own HTTP session (certificates verified).
pub struct NewsFeed {
    client: Client,
    url_template: String,
}

impl NewsFeed {
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Feed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    /// Feed URL for a symbol.
    pub fn url_for(&self, symbol: &str) -> String {
        self.url_template.replace("{symbol}", symbol.trim())
    }

    /// Fetch and parse headlines, reporting every failure.
    pub fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<NewsItem>, GatewayError> {
        let url = self.url_for(symbol);
        debug!("Fetching headlines from {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| GatewayError::Feed(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Feed(format!("feed returned {}", resp.status())));
        }

        let body = resp
            .text()
            .map_err(|e| GatewayError::Feed(format!("failed to read feed: {e}")))?;
        parse_rss(&body, limit)
    }

    /// Headlines for a symbol; empty on any failure.
    pub fn headlines(&self, symbol: &str, limit: usize) -> Vec<NewsItem> {
        items_or_empty(symbol, self.fetch(symbol, limit))
    }
}

/// Best-effort view of a fetch or parse result: faults become no items.
pub fn items_or_empty(
    symbol: &str,
    result: Result<Vec<NewsItem>, GatewayError>,
) -> Vec<NewsItem> {
    result.unwrap_or_else(|e| {
        warn!("No headlines for {symbol}: {e}");
        Vec::new()
    })
}
