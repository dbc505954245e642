//! Run configuration, loaded from an optional TOML file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::table::TableLayout;
use crate::transport::{HttpOptions, DEFAULT_USER_AGENT, MAX_RETRY_DELAY};
use crate::types::{ScrapeError, ScrapeResult};

/// The dashboard report page every request goes to.
pub const DEFAULT_ENDPOINT: &str =
    "https://vahan.parivahan.gov.in/vahan4dashboard/vahan/view/reportview.xhtml";

/// Upper bound on `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// First year with data worth fetching.
pub const DEFAULT_START_YEAR: i32 = 2022;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeConfig {
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Retries for connection failures and 5xx responses.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further one.
    pub retry_backoff_ms: u64,
    pub user_agent: String,
    pub start_year: i32,
    /// Abort on the first malformed table instead of skipping the unit.
    pub fail_fast: bool,
    pub layout: TableLayout,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: 30_000,
            max_retries: 2,
            retry_backoff_ms: 500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            start_year: DEFAULT_START_YEAR,
            fail_fast: false,
            layout: TableLayout::default(),
        }
    }
}

impl ScrapeConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml(text: &str) -> ScrapeResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ScrapeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ScrapeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> ScrapeResult<()> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| ScrapeError::Config(format!("endpoint {:?}: {e}", self.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScrapeError::Config(format!(
                "endpoint must be http(s), got {}",
                url.scheme()
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ScrapeError::Config("timeout_ms must be positive".into()));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ScrapeError::Config(format!(
                "max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.max_retries
            )));
        }
        let max_backoff_ms = MAX_RETRY_DELAY.as_millis();
        if u128::from(self.retry_backoff_ms) > max_backoff_ms {
            return Err(ScrapeError::Config(format!(
                "retry_backoff_ms must be at most {max_backoff_ms}, got {}",
                self.retry_backoff_ms
            )));
        }
        self.layout.validate()
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            user_agent: self.user_agent.clone(),
        }
    }
}
