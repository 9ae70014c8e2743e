//! Gateway error types.

/// Errors that can occur while talking to the gateway or the news feed.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("gateway returned {status} for {path}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("no account selected")]
    NoAccount,

    #[error("refusing non read-only request: {0}")]
    ReadOnlyViolation(String),

    #[error("news feed error: {0}")]
    Feed(String),
}

impl GatewayError {
    /// True when the gateway answered 401/403, i.e. the session is not
    /// authenticated (as opposed to the gateway being unreachable).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Status { status: 401 | 403, .. })
    }
}
