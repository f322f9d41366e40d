//! Client configuration from the environment

use std::time::Duration;

use crate::error::{ClientError, Result};

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Connection settings for the membership API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// Request timeout; `None` keeps the HTTP client's default
    pub timeout: Option<Duration>,
    /// Period of the background roster refresh
    pub refresh_interval: Duration,
    /// Bypass system proxy settings
    pub no_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: None,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            no_proxy: false,
        }
    }
}

impl ClientConfig {
    /// Read `ROSTER_API_URL`, `ROSTER_API_TIMEOUT_SECS`,
    /// `ROSTER_REFRESH_INTERVAL_SECS` and `ROSTER_NO_PROXY`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("ROSTER_API_URL").filter(|url| !url.trim().is_empty()) {
            config = config.with_base_url(url);
        }
        if let Some(secs) = parse_secs(&lookup, "ROSTER_API_TIMEOUT_SECS")? {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_secs(&lookup, "ROSTER_REFRESH_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(ClientError::Config(
                    "ROSTER_REFRESH_INTERVAL_SECS must be greater than zero".to_string(),
                ));
            }
            config.refresh_interval = Duration::from_secs(secs);
        }
        config.no_proxy = flag(lookup("ROSTER_NO_PROXY"), false);

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_no_proxy(mut self, no_proxy: bool) -> Self {
        self.no_proxy = no_proxy;
        self
    }
}

fn flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ClientError::Config(format!("{} must be a whole number, got '{}'", name, raw))),
        _ => Ok(None),
    }
}
