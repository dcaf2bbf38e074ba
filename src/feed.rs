//! Market feed client and raw log entry types
//!
//! The feed serves paginated transaction logs per item, newest entry
//! first. Only entries tagged as market transactions are of interest;
//! everything else (crafting logs, chat events, ...) is dropped by the
//! relevance filter rather than treated as an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Log entry tag marking a completed market trade
pub const MARKET_TRANSACTION_TYPE: &str = "marketItemTransaction";

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// One raw entry of an item's transaction log, as served by the feed
///
/// The payload shape varies by entry kind, so `date` and `data` are held
/// loosely until [`RawLogEntry::trade`] proves the entry relevant.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLogEntry {
    #[serde(rename = "gameLog", default)]
    pub game_log: GameLog,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GameLog {
    #[serde(rename = "type")]
    pub kind: String,
    pub date: serde_json::Value,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct TradeData {
    amount: u64,
    #[serde(rename = "listingPrice")]
    listing_price: f64,
}

/// A market trade extracted from a relevant log entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketTrade {
    pub executed_at: DateTime<Utc>,
    /// Traded quantity
    pub amount: u64,
    /// Price per unit the listing sold at
    pub listing_price: f64,
}

impl RawLogEntry {
    /// Extract the market trade carried by this entry, if any.
    ///
    /// Entries of other kinds, and entries missing a timestamp or a
    /// well-formed `amount`/`listingPrice` pair, yield `None`.
    pub fn trade(&self) -> Option<MarketTrade> {
        if self.game_log.kind != MARKET_TRANSACTION_TYPE {
            return None;
        }

        let executed_at: DateTime<Utc> =
            serde_json::from_value(self.game_log.date.clone()).ok()?;
        let data: TradeData = serde_json::from_value(self.game_log.data.clone()).ok()?;

        if data.amount == 0 || data.listing_price <= 0.0 {
            return None;
        }

        Some(MarketTrade {
            executed_at,
            amount: data.amount,
            listing_price: data.listing_price,
        })
    }
}

#[derive(Debug)]
pub enum FeedError {
    /// Feed unreachable at run start; fatal for the whole run
    NotConnected,
    Http(reqwest::Error),
    Status(reqwest::StatusCode),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err)
    }
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::NotConnected => write!(f, "Feed not connected"),
            FeedError::Http(e) => write!(f, "Feed request failed: {}", e),
            FeedError::Status(code) => write!(f, "Feed returned HTTP {}", code),
        }
    }
}

impl std::error::Error for FeedError {}

/// Capability to request one page of raw transaction log entries
#[async_trait]
pub trait LogFeed: Send + Sync {
    /// Whether the feed answered the connectivity probe
    fn is_connected(&self) -> bool;

    /// Fetch one page (1-indexed) of an item's transaction log,
    /// newest entry first. An empty page is a valid response.
    async fn fetch_page(&self, item_id: u32, page: u32) -> Result<Vec<RawLogEntry>, FeedError>;
}

/// HTTP implementation of [`LogFeed`] against the game's data endpoint
pub struct HttpLogFeed {
    client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
    connected: bool,
}

impl HttpLogFeed {
    /// Build the client and probe the endpoint once. A failed probe is
    /// not an error here; it surfaces as `is_connected() == false` so
    /// the pipeline can fast-fail the run.
    pub async fn connect(
        base_url: &str,
        session_token: Option<String>,
    ) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let mut feed = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token,
            connected: false,
        };
        feed.connected = feed.probe().await;

        if feed.connected {
            log::info!("🔌 Connected to feed at {}", feed.base_url);
        } else {
            log::warn!("⚠️  Feed probe failed for {}", feed.base_url);
        }

        Ok(feed)
    }

    async fn probe(&self) -> bool {
        match self.client.get(&self.base_url).send().await {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Feed probe error: {}", e);
                false
            }
        }
    }

    fn data_request(&self, item_id: u32, page: u32) -> reqwest::RequestBuilder {
        let body = serde_json::json!({
            "type": "richLogsByIdType",
            "idType": "itemId",
            "id": item_id,
            "page": page,
        });

        let mut request = self
            .client
            .post(format!("{}/api/dataFetch", self.base_url))
            .json(&body);

        if let Some(token) = &self.session_token {
            request = request.header("Cookie", format!("connect.sid={}", token));
        }

        request
    }
}

#[async_trait]
impl LogFeed for HttpLogFeed {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn fetch_page(&self, item_id: u32, page: u32) -> Result<Vec<RawLogEntry>, FeedError> {
        let response = self.data_request(item_id, page).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}
