//! Scripted gateway for tests: implements [`Gateway`] with queued responses.
//!
//! Responses are queued per path and handed out in order; the last one
//! keeps repeating. Every call is recorded for assertions. The read-only
//! guard applies here exactly as it does on the HTTP transport.
//!
//! ```ignore
//! use ibkr_readonly::mock::ScriptedGateway;
//! use serde_json::json;
//!
//! let gateway = ScriptedGateway::builder()
//!     .respond("/iserver/marketdata/snapshot", json!({}))
//!     .respond("/iserver/marketdata/snapshot", json!([{"31": "189.50"}]))
//!     .build();
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::GatewayError;
use crate::gateway::{Gateway, Method, ensure_read_only};

/// One scripted reaction to a request.
#[derive(Clone, Debug)]
enum Reaction {
    Reply(Value),
    Fail(String),
    Status(u16),
}

/// A request the scripted gateway received.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RecordedCall {
    /// Value of a query parameter, if it was sent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builder for `ScriptedGateway`.
#[derive(Default)]
pub struct ScriptedGatewayBuilder {
    scripts: FxHashMap<String, VecDeque<Reaction>>,
}

impl ScriptedGatewayBuilder {
    /// Queue a JSON response for `path`.
    pub fn respond(self, path: &str, value: Value) -> Self {
        self.push(path, Reaction::Reply(value))
    }

    /// Queue a connection failure for `path`.
    pub fn fail(self, path: &str, message: &str) -> Self {
        self.push(path, Reaction::Fail(message.to_string()))
    }

    /// Queue an HTTP error status for `path`.
    pub fn status(self, path: &str, status: u16) -> Self {
        self.push(path, Reaction::Status(status))
    }

    fn push(mut self, path: &str, reaction: Reaction) -> Self {
        self.scripts
            .entry(path.to_string())
            .or_default()
            .push_back(reaction);
        self
    }

    pub fn build(self) -> ScriptedGateway {
        ScriptedGateway {
            scripts: Mutex::new(self.scripts),
            calls: Mutex::new(Vec::new()),
        }
    }
}

/// A gateway that replays scripted responses and records requests.
pub struct ScriptedGateway {
    scripts: Mutex<FxHashMap<String, VecDeque<Reaction>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub fn builder() -> ScriptedGatewayBuilder {
        ScriptedGatewayBuilder::default()
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls made to `path`.
    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    fn record(&self, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn next(&self, path: &str) -> Result<Value, GatewayError> {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        let queue = scripts
            .get_mut(path)
            .ok_or_else(|| GatewayError::Connection(format!("mock: nothing scripted for {path}")))?;

        let reaction = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match reaction {
            Some(Reaction::Reply(value)) => Ok(value),
            Some(Reaction::Fail(message)) => Err(GatewayError::Connection(message)),
            Some(Reaction::Status(status)) => Err(GatewayError::Status {
                path: path.to_string(),
                status,
                body: String::new(),
            }),
            None => Err(GatewayError::Connection(format!(
                "mock: nothing scripted for {path}"
            ))),
        }
    }
}

impl Gateway for ScriptedGateway {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        ensure_read_only(Method::Get, path)?;
        self.record(RecordedCall {
            method: Method::Get,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: None,
        });
        self.next(path)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        ensure_read_only(Method::Post, path)?;
        self.record(RecordedCall {
            method: Method::Post,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        });
        self.next(path)
    }
}
