//! Sequential collection pipeline
//!
//! Plans the window once, then walks the selected items one at a time:
//! aggregate the window's trades, derive statistics, upsert the record.
//! Items and pages are deliberately processed serially with fixed
//! delays to respect the feed's rate limits. A failure while
//! processing one item is recorded and the driver moves on; it never
//! touches any other item's record.

use crate::aggregate::{aggregate_item, FetchLimits};
use crate::catalog::{ItemCatalog, ItemSelector};
use crate::feed::{FeedError, LogFeed};
use crate::stats::{compute_stats, PriceStats};
use crate::store::{StatsStore, StoreError};
use crate::window::{plan_window_at, Granularity, Window};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::sleep;

const PROGRESS_EVERY: u32 = 5;

/// Invocation parameters for one collection run
#[derive(Debug, Clone)]
pub struct FetchParams {
    pub granularity: Granularity,
    pub period: u32,
    pub offset: u32,
    pub selector: ItemSelector,
    pub limits: FetchLimits,
    /// Courtesy delay between items
    pub item_delay: Duration,
}

#[derive(Debug)]
pub enum PipelineError {
    /// Feed unavailable at run start; nothing was attempted
    NotConnected,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::NotConnected => write!(f, "Feed not connected, run aborted"),
        }
    }
}

impl std::error::Error for PipelineError {}

#[derive(Debug)]
enum ItemError {
    Feed(FeedError),
    Store(StoreError),
}

impl From<FeedError> for ItemError {
    fn from(err: FeedError) -> Self {
        ItemError::Feed(err)
    }
}

impl From<StoreError> for ItemError {
    fn from(err: StoreError) -> Self {
        ItemError::Store(err)
    }
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemError::Feed(e) => write!(f, "{}", e),
            ItemError::Store(e) => write!(f, "{}", e),
        }
    }
}

/// One item the run could not complete, with the reason
#[derive(Debug)]
pub struct ItemFailure {
    pub item_id: u32,
    pub reason: String,
}

/// Outcome of a full run
#[derive(Debug)]
pub struct FetchReport {
    pub window: Window,
    /// Records successfully upserted
    pub processed: u32,
    pub failures: Vec<ItemFailure>,
}

/// Run the collection pipeline against the current time.
pub async fn run_market_fetch(
    feed: &dyn LogFeed,
    store: &dyn StatsStore,
    catalog: &ItemCatalog,
    params: &FetchParams,
) -> Result<FetchReport, PipelineError> {
    run_market_fetch_at(feed, store, catalog, params, Utc::now()).await
}

/// Deterministic variant of [`run_market_fetch`] with an explicit
/// "now" anchoring the window.
pub async fn run_market_fetch_at(
    feed: &dyn LogFeed,
    store: &dyn StatsStore,
    catalog: &ItemCatalog,
    params: &FetchParams,
    now: DateTime<Utc>,
) -> Result<FetchReport, PipelineError> {
    if !feed.is_connected() {
        return Err(PipelineError::NotConnected);
    }

    let window = plan_window_at(params.granularity, params.period, params.offset, now);
    log::info!(
        "🕒 Aggregating window [{}, {})",
        window.start.to_rfc3339(),
        window.end.to_rfc3339()
    );

    let range = params.selector.range(catalog);
    let total = range.end.saturating_sub(range.start);

    let mut processed = 0u32;
    let mut failures = Vec::new();

    for (item_id, done) in range.zip(1u32..) {
        match process_item(feed, store, item_id, &window, &params.limits).await {
            Ok(stats) => {
                processed += 1;
                log::debug!(
                    "💾 Item {} ({}): num={} avg={:.2} med={:.2}",
                    item_id,
                    catalog.label(item_id).unwrap_or("?"),
                    stats.num,
                    stats.avg,
                    stats.med
                );
            }
            Err(e) => {
                log::error!("❌ Item {} failed: {}", item_id, e);
                failures.push(ItemFailure {
                    item_id,
                    reason: e.to_string(),
                });
            }
        }

        if done % PROGRESS_EVERY == 0 {
            log::info!("📦 Logged {} of {} items", done, total);
        }

        if !params.item_delay.is_zero() {
            sleep(params.item_delay).await;
        }
    }

    Ok(FetchReport {
        window,
        processed,
        failures,
    })
}

async fn process_item(
    feed: &dyn LogFeed,
    store: &dyn StatsStore,
    item_id: u32,
    window: &Window,
    limits: &FetchLimits,
) -> Result<PriceStats, ItemError> {
    let volumes = aggregate_item(feed, item_id, window, limits).await?;
    // A window with zero trades is a valid, all-zero record.
    let stats = compute_stats(&volumes);
    store.upsert_stats(item_id, window, &stats).await?;
    Ok(stats)
}
