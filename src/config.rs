//! Run configuration from environment variables

use crate::aggregate::FetchLimits;
use crate::catalog::ItemSelector;
use crate::pipeline::FetchParams;
use crate::window::Granularity;
use std::env;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for one collector run
///
/// Loaded from environment variables with defaults matching the live
/// feed's pacing expectations.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the market feed endpoint
    pub feed_url: String,
    /// Session token attached to feed requests
    pub session_token: Option<String>,
    /// Path to the SQLite stats database
    pub db_path: String,
    /// Path to the item catalog JSON file
    pub catalog_path: String,
    pub granularity: Granularity,
    /// Window length in granularity units
    pub period: u32,
    /// How many periods back the window lies
    pub offset: u32,
    pub selector: ItemSelector,
    pub max_pages: u32,
    pub page_delay_ms: u64,
    pub item_delay_ms: u64,
    pub page_retries: u32,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `MARKET_FEED_URL` (required, http(s) URL)
    /// - `MARKET_SESSION_TOKEN` (optional)
    /// - `MARKETWATCH_DB_PATH` (default: data/marketwatch.db)
    /// - `ITEM_CATALOG_PATH` (default: data/items.json)
    /// - `FETCH_GRANULARITY` (default: h)
    /// - `FETCH_PERIOD` (default: 4, must be positive)
    /// - `FETCH_OFFSET` (default: 1)
    /// - `FETCH_ITEM` (default: all; or a numeric item id)
    /// - `MAX_PAGES` (default: 20)
    /// - `PAGE_DELAY_MS` (default: 500)
    /// - `ITEM_DELAY_MS` (default: 2000)
    /// - `PAGE_RETRIES` (default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        let feed_url = env::var("MARKET_FEED_URL")
            .map_err(|_| ConfigError::MissingVariable("MARKET_FEED_URL".to_string()))?;

        if !feed_url.starts_with("http://") && !feed_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "MARKET_FEED_URL must start with http:// or https://".to_string(),
            ));
        }

        let granularity_str = env::var("FETCH_GRANULARITY").unwrap_or_else(|_| "h".to_string());
        let granularity = Granularity::parse(&granularity_str).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "FETCH_GRANULARITY must be one of h, d (got '{}')",
                granularity_str
            ))
        })?;

        let period = parse_or("FETCH_PERIOD", 4);
        if period == 0 {
            return Err(ConfigError::InvalidValue(
                "FETCH_PERIOD must be a positive integer".to_string(),
            ));
        }

        let selector_str = env::var("FETCH_ITEM").unwrap_or_else(|_| "all".to_string());
        let selector = ItemSelector::parse(&selector_str).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "FETCH_ITEM must be 'all' or an item id (got '{}')",
                selector_str
            ))
        })?;

        Ok(Self {
            feed_url,
            session_token: env::var("MARKET_SESSION_TOKEN").ok(),
            db_path: env::var("MARKETWATCH_DB_PATH")
                .unwrap_or_else(|_| "data/marketwatch.db".to_string()),
            catalog_path: env::var("ITEM_CATALOG_PATH")
                .unwrap_or_else(|_| "data/items.json".to_string()),
            granularity,
            period,
            offset: parse_or("FETCH_OFFSET", 1),
            selector,
            max_pages: parse_or("MAX_PAGES", 20),
            page_delay_ms: parse_or("PAGE_DELAY_MS", 500),
            item_delay_ms: parse_or("ITEM_DELAY_MS", 2_000),
            page_retries: parse_or("PAGE_RETRIES", 0),
        })
    }

    pub fn fetch_params(&self) -> FetchParams {
        FetchParams {
            granularity: self.granularity,
            period: self.period,
            offset: self.offset,
            selector: self.selector,
            limits: FetchLimits {
                max_pages: self.max_pages,
                page_delay: Duration::from_millis(self.page_delay_ms),
                page_retries: self.page_retries,
            },
            item_delay: Duration::from_millis(self.item_delay_ms),
        }
    }
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
