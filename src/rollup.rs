//! Combined statistics over already-persisted window records
//!
//! Stored records carry enough (mean, population stdev, volume) to pool
//! several windows into one exact aggregate without touching the raw
//! trades again. Used for 24h day summaries over shorter windows.

use crate::store::{SqliteStatsStore, StoreError, StoredStats};
use chrono::{DateTime, Utc};

const DAY_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollupStats {
    pub avg: f64,
    pub stdev: f64,
    pub num: u64,
}

impl RollupStats {
    pub fn zeroed() -> Self {
        Self {
            avg: 0.0,
            stdev: 0.0,
            num: 0,
        }
    }
}

/// Pool several window records into one.
///
/// Volume-weighted mean; variance via the law of total variance, so the
/// result matches a direct computation over the union of the underlying
/// trades.
pub fn combine_stats(records: &[StoredStats]) -> RollupStats {
    let num: u64 = records.iter().map(|r| r.num).sum();
    if num == 0 {
        return RollupStats::zeroed();
    }

    let avg = records
        .iter()
        .map(|r| r.avg * r.num as f64)
        .sum::<f64>()
        / num as f64;

    let variance = records
        .iter()
        .map(|r| r.num as f64 * (r.stdev.powi(2) + (r.avg - avg).powi(2)))
        .sum::<f64>()
        / num as f64;

    RollupStats {
        avg,
        stdev: variance.sqrt(),
        num,
    }
}

/// 24-hour rollup of one item's stored windows starting at `day_start`.
pub fn day_rollup(
    store: &SqliteStatsStore,
    item_id: u32,
    day_start: DateTime<Utc>,
) -> Result<RollupStats, StoreError> {
    let from = day_start.timestamp();
    let records = store.fetch_stats_range(item_id, from, from + DAY_SECS)?;
    Ok(combine_stats(&records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Price, PriceVolumeMap};
    use crate::stats::compute_stats;
    use crate::store::StatsStore;
    use crate::window::{plan_window_at, Granularity};
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    fn volumes(buckets: &[(f64, u64)]) -> PriceVolumeMap {
        buckets.iter().map(|&(p, n)| (Price(p), n)).collect()
    }

    fn stored(window_start: i64, buckets: &[(f64, u64)]) -> StoredStats {
        let stats = compute_stats(&volumes(buckets));
        StoredStats {
            window_start,
            avg: stats.avg,
            stdev: stats.stdev,
            num: stats.num,
        }
    }

    #[test]
    fn test_empty_rollup_is_zero() {
        assert_eq!(combine_stats(&[]), RollupStats::zeroed());
        assert_eq!(
            combine_stats(&[stored(0, &[])]),
            RollupStats::zeroed()
        );
    }

    #[test]
    fn test_pooled_stats_match_direct_computation() {
        // Two windows of trades; pooling their summaries must equal
        // computing over all trades at once.
        let first: &[(f64, u64)] = &[(10.0, 2), (20.0, 3)];
        let second: &[(f64, u64)] = &[(20.0, 1), (40.0, 4)];

        let pooled = combine_stats(&[stored(0, first), stored(14_400, second)]);

        let mut merged = volumes(first);
        for (price, n) in volumes(second) {
            *merged.entry(price).or_insert(0) += n;
        }
        let direct = compute_stats(&merged);

        assert_eq!(pooled.num, direct.num);
        assert!((pooled.avg - direct.avg).abs() < 1e-9);
        assert!((pooled.stdev - direct.stdev).abs() < 1e-9);
    }

    #[test]
    fn test_single_record_passes_through() {
        let record = stored(0, &[(10.0, 2), (20.0, 2)]);
        let pooled = combine_stats(&[record]);

        assert_eq!(pooled.num, 4);
        assert_eq!(pooled.avg, record.avg);
        assert!((pooled.stdev - record.stdev).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_day_rollup_reads_only_that_day() {
        let temp = NamedTempFile::new().unwrap();
        let store = SqliteStatsStore::open(temp.path().to_str().unwrap()).unwrap();

        let day_start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        // Six 4h windows inside the day plus one before it.
        let now = Utc.with_ymd_and_hms(2024, 1, 3, 0, 30, 0).unwrap();
        for periods_back in 1..=7u32 {
            let window = plan_window_at(Granularity::Hour, 4, periods_back, now);
            let stats = compute_stats(&volumes(&[(10.0, 1), (20.0, 1)]));
            store.upsert_stats(9, &window, &stats).await.unwrap();
        }

        let rollup = day_rollup(&store, 9, day_start).unwrap();
        assert_eq!(rollup.num, 12);
        assert_eq!(rollup.avg, 15.0);

        let empty_day = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(day_rollup(&store, 9, empty_day).unwrap(), RollupStats::zeroed());
    }
}
