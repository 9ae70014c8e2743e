//! HTTP transport to the Client Portal gateway.
//!
//! The gateway is a local process with a self-signed certificate, so
//! certificate validation is switched off. Every path goes through
//! [`ensure_read_only`] before a request is built: order entry endpoints
//! are unreachable through this crate.

use log::debug;
use reqwest::blocking::{Client, Response};
use serde_json::{Map, Value};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Prefix of every REST endpoint served by the gateway.
pub const API_PREFIX: &str = "/v1/api";

/// The only endpoints that may be POSTed to. Both are reads in disguise.
pub const POST_WHITELIST: &[&str] = &["/tickle", "/iserver/scanner/run"];

/// Path segments that identify order entry, modification or cancellation.
const ORDER_SEGMENTS: &[&str] = &["order", "orders", "reply", "whatif"];

/// HTTP method of a gateway request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// The two-call contract everything else is built on.
pub trait Gateway {
    /// GET `path` with query parameters, decoding the JSON body.
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError>;

    /// POST a JSON body to `path`, decoding the JSON response.
    fn post(&self, path: &str, body: &Value) -> Result<Value, GatewayError>;
}

impl<G: Gateway + ?Sized> Gateway for &G {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        (**self).get(path, query)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        (**self).post(path, body)
    }
}

impl<G: Gateway + ?Sized> Gateway for Box<G> {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        (**self).get(path, query)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        (**self).post(path, body)
    }
}

/// Reject any request that could touch orders.
pub fn ensure_read_only(method: Method, path: &str) -> Result<(), GatewayError> {
    let route = path.split('?').next().unwrap_or(path);
    let touches_orders = route
        .split('/')
        .any(|segment| ORDER_SEGMENTS.contains(&segment.to_ascii_lowercase().as_str()));
    if touches_orders {
        return Err(GatewayError::ReadOnlyViolation(format!(
            "{method:?} {route} is an order endpoint"
        )));
    }
    if method == Method::Post && !POST_WHITELIST.contains(&route) {
        return Err(GatewayError::ReadOnlyViolation(format!(
            "POST {route} is not whitelisted"
        )));
    }
    Ok(())
}

/// Blocking gateway client over a single reqwest session.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Build a client for the configured gateway. No request is sent.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn decode(path: &str, resp: Response) -> Result<Value, GatewayError> {
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| GatewayError::Connection(format!("failed to read {path}: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        decode_body(path, &body)
    }
}

/// Decode a response body. An empty body is an empty object, not an error.
pub fn decode_body(path: &str, body: &str) -> Result<Value, GatewayError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(body).map_err(|e| GatewayError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

impl Gateway for HttpGateway {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        ensure_read_only(Method::Get, path)?;
        debug!("GET {path} {query:?}");

        let resp = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .map_err(|e| GatewayError::Connection(format!("GET {path} failed: {e}")))?;

        Self::decode(path, resp)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        ensure_read_only(Method::Post, path)?;
        debug!("POST {path}");

        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .map_err(|e| GatewayError::Connection(format!("POST {path} failed: {e}")))?;

        Self::decode(path, resp)
    }
}
