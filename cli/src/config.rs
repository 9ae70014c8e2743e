//! TOML configuration loading, validation and merging.
//!
//! Every key has a default, so an absent or empty file is a valid config.
//! Precedence, strongest first: command-line flags, this file, the
//! environment (`IBEAM_GATEWAY_BASE_URL`, `IBKR_ACCOUNT_ID`), built-in
//! defaults.

use std::path::Path;
use std::time::Duration;

use ibkr_readonly::news::{DEFAULT_FEED_URL, DEFAULT_LIMIT};
use ibkr_readonly::{GatewayConfig, PollSettings, ScannerFilter};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewaySection,
    pub polling: PollingSection,
    pub news: NewsSection,
    pub scanner: ScannerFilter,
}

/// `[gateway]`. Unset keys fall through to the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub base_url: Option<String>,
    pub account_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: None,
            account_id: None,
            timeout_secs: 15,
        }
    }
}

/// `[polling]`: snapshot cadence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    pub max_attempts: u32,
    pub warmup_ms: u64,
    pub retry_ms: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            warmup_ms: 1000,
            retry_ms: 500,
        }
    }
}

/// `[news]`: headline feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsSection {
    /// URL template with a `{symbol}` placeholder.
    pub feed_url: String,
    pub limit: usize,
    pub timeout_secs: u64,
}

impl Default for NewsSection {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            limit: DEFAULT_LIMIT,
            timeout_secs: 10,
        }
    }
}

/// Overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub account_id: Option<String>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.gateway.base_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::Config(format!(
                    "gateway.base_url must be an http(s) URL, got {url:?}"
                )));
            }
        }
        if self.gateway.timeout_secs == 0 {
            return Err(Error::Config("gateway.timeout_secs must be > 0".into()));
        }
        if self.polling.max_attempts == 0 {
            return Err(Error::Config("polling.max_attempts must be >= 1".into()));
        }
        if !self.news.feed_url.contains("{symbol}") {
            return Err(Error::Config(
                "news.feed_url must contain a {symbol} placeholder".into(),
            ));
        }
        if self.news.timeout_secs == 0 {
            return Err(Error::Config("news.timeout_secs must be > 0".into()));
        }
        if self.scanner.min_market_cap < 0.0 {
            return Err(Error::Config("scanner.min_market_cap must be >= 0".into()));
        }
        Ok(())
    }

    /// Merge flags, this file and an environment-derived config.
    pub fn gateway_config(&self, env: GatewayConfig, overrides: &Overrides) -> GatewayConfig {
        let mut config = env.with_timeout(Duration::from_secs(self.gateway.timeout_secs));

        let base_url = overrides
            .base_url
            .as_deref()
            .or(self.gateway.base_url.as_deref());
        if let Some(url) = base_url {
            config = config.with_base_url(url);
        }

        let account = overrides
            .account_id
            .as_deref()
            .or(self.gateway.account_id.as_deref());
        if let Some(account) = account {
            config = config.with_account_id(account);
        }
        config
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            max_attempts: self.polling.max_attempts,
            warmup_delay: Duration::from_millis(self.polling.warmup_ms),
            retry_delay: Duration::from_millis(self.polling.retry_ms),
        }
    }

    pub fn news_timeout(&self) -> Duration {
        Duration::from_secs(self.news.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[gateway]
base_url = "https://gateway.local:5000"
account_id = "DU123456"
timeout_secs = 20

[polling]
max_attempts = 5
warmup_ms = 2000
retry_ms = 250

[news]
feed_url = "https://news.example.com/rss?s={symbol}"
limit = 3

[scanner]
scan_type = "TOP_PERC_GAIN"
min_market_cap = 500.0
"#
    }

    #[test]
    fn parse_example_config() {
        let config = Config::parse(example_toml()).unwrap();
        assert_eq!(config.gateway.timeout_secs, 20);
        assert_eq!(config.polling.max_attempts, 5);
        assert_eq!(config.news.limit, 3);
        assert_eq!(config.news.timeout_secs, 10);
        assert_eq!(config.scanner.scan_type, "TOP_PERC_GAIN");
        assert_eq!(config.scanner.instrument, "STK");
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.gateway.base_url, None);
        assert_eq!(config.poll_settings(), PollSettings::default());
        assert_eq!(config.news.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.scanner, ScannerFilter::default());
    }

    #[test]
    fn validate_catches_zero_attempts() {
        let toml = example_toml().replace("max_attempts = 5", "max_attempts = 0");
        assert!(matches!(Config::parse(&toml), Err(Error::Config(_))));
    }

    #[test]
    fn validate_catches_bad_url() {
        let toml = example_toml().replace("https://gateway.local:5000", "gateway.local");
        assert!(Config::parse(&toml).is_err());
    }

    #[test]
    fn validate_catches_feed_without_placeholder() {
        let toml = example_toml().replace("?s={symbol}", "");
        assert!(Config::parse(&toml).is_err());
    }

    #[test]
    fn unknown_type_is_parse_error() {
        let result = Config::parse("[polling]\nmax_attempts = \"many\"\n");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn file_overrides_environment() {
        let config = Config::parse(example_toml()).unwrap();
        let env = GatewayConfig::default()
            .with_base_url("https://env.local:5001")
            .with_account_id("U_ENV");

        let merged = config.gateway_config(env, &Overrides::default());
        assert_eq!(merged.base_url, "https://gateway.local:5000");
        assert_eq!(merged.account_id, "DU123456");
        assert_eq!(merged.timeout, Duration::from_secs(20));
    }

    #[test]
    fn flags_override_file() {
        let config = Config::parse(example_toml()).unwrap();
        let overrides = Overrides {
            base_url: None,
            account_id: Some("U_FLAG".into()),
        };
        let merged = config.gateway_config(GatewayConfig::default(), &overrides);
        assert_eq!(merged.account_id, "U_FLAG");
        assert_eq!(merged.base_url, "https://gateway.local:5000");
    }

    #[test]
    fn environment_used_when_file_silent() {
        let config = Config::default();
        let env = GatewayConfig::default().with_account_id("U_ENV");
        let merged = config.gateway_config(env, &Overrides::default());
        assert_eq!(merged.account_id, "U_ENV");
        assert_eq!(merged.base_url, "https://localhost:5001");
    }

    #[test]
    fn poll_settings_from_millis() {
        let config = Config::parse(example_toml()).unwrap();
        let poll = config.poll_settings();
        assert_eq!(poll.max_attempts, 5);
        assert_eq!(poll.warmup_delay, Duration::from_millis(2000));
        assert_eq!(poll.retry_delay, Duration::from_millis(250));
    }
}
