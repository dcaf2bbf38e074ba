//! Windowed aggregation of traded volume per listing price
//!
//! Pages through an item's transaction log (newest first), keeps the
//! trades that fall inside the window, and accumulates their amounts
//! into per-price buckets. Paging stops as soon as an entry older than
//! the window shows up, or when the page budget runs out.

use crate::backoff::ExponentialBackoff;
use crate::feed::{FeedError, LogFeed, MarketTrade, RawLogEntry};
use crate::window::Window;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;

const RETRY_INITIAL_MS: u64 = 500;
const RETRY_MAX_MS: u64 = 5_000;

/// Listing price usable as an ordered map key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price(pub f64);

impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Traded volume per listing price for one (item, window) pair,
/// ordered by ascending price
pub type PriceVolumeMap = BTreeMap<Price, u64>;

/// Paging and pacing limits for one aggregation run
#[derive(Debug, Clone)]
pub struct FetchLimits {
    /// Hard page cap per item; guarantees forward progress even if the
    /// feed never runs out of pages
    pub max_pages: u32,
    /// Courtesy delay between page requests
    pub page_delay: Duration,
    /// Retries per failed page request before the item is given up
    pub page_retries: u32,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_pages: 20,
            page_delay: Duration::from_millis(500),
            page_retries: 0,
        }
    }
}

/// Aggregate one item's traded volume per price over `window`.
///
/// An empty map is a valid outcome (no trades in the window). A page
/// fetch that still fails after the configured retries aborts this
/// item only.
pub async fn aggregate_item(
    feed: &dyn LogFeed,
    item_id: u32,
    window: &Window,
    limits: &FetchLimits,
) -> Result<PriceVolumeMap, FeedError> {
    let mut volumes = PriceVolumeMap::new();
    let mut page = 1u32;
    let mut searching = true;

    while searching && page <= limits.max_pages {
        let entries = fetch_page_with_retry(feed, item_id, page, limits).await?;
        page += 1;

        if !limits.page_delay.is_zero() {
            sleep(limits.page_delay).await;
        }

        let trades: Vec<MarketTrade> = entries.iter().filter_map(RawLogEntry::trade).collect();

        // Pages are newest-first, so the last relevant trade is the
        // oldest. Skip the page when nothing relevant is on it or the
        // whole page is still newer than the window.
        match trades.last() {
            None => continue,
            Some(oldest) if oldest.executed_at >= window.end => continue,
            _ => {}
        }

        for trade in trades {
            if trade.executed_at < window.start {
                // Crossed the older window boundary; everything further
                // back is out of range too.
                searching = false;
                break;
            }

            if trade.executed_at >= window.end {
                continue;
            }

            *volumes.entry(Price(trade.listing_price)).or_insert(0) += trade.amount;
        }
    }

    Ok(volumes)
}

async fn fetch_page_with_retry(
    feed: &dyn LogFeed,
    item_id: u32,
    page: u32,
    limits: &FetchLimits,
) -> Result<Vec<RawLogEntry>, FeedError> {
    let mut backoff = ExponentialBackoff::new(RETRY_INITIAL_MS, RETRY_MAX_MS, limits.page_retries);

    loop {
        match feed.fetch_page(item_id, page).await {
            Ok(entries) => return Ok(entries),
            Err(err) => {
                log::warn!("⚠️  Page {} fetch failed for item {}: {}", page, item_id, err);
                if backoff.sleep().await.is_err() {
                    return Err(err);
                }
            }
        }
    }
}
