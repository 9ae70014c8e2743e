//! Gateway connection settings, resolved once from the environment.

use std::env;
use std::time::Duration;

/// Default base URL of a locally running Client Portal gateway.
pub const DEFAULT_BASE_URL: &str = "https://localhost:5001";

/// Environment variable holding the gateway base URL.
pub const BASE_URL_ENV: &str = "IBEAM_GATEWAY_BASE_URL";

/// Environment variable holding the default account id.
pub const ACCOUNT_ID_ENV: &str = "IBKR_ACCOUNT_ID";

/// Where the gateway lives and which account to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Empty means "not selected yet".
    pub account_id: String,
    /// Per-request wall-clock timeout.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            account_id: String::new(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl GatewayConfig {
    /// Read `IBEAM_GATEWAY_BASE_URL` and `IBKR_ACCOUNT_ID` from the process
    /// environment, falling back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config = config.with_base_url(&url);
        }
        if let Some(account) = lookup(ACCOUNT_ID_ENV) {
            config.account_id = account.trim().to_string();
        }
        config
    }

    /// Override the base URL. A trailing slash is dropped.
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_account_id(mut self, account_id: &str) -> Self {
        self.account_id = account_id.trim().to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
