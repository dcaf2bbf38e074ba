//! Pure statistics over a price/volume aggregation
//!
//! Every measure is derived from the bucketed map alone, so the cost is
//! O(distinct prices) regardless of how many trades backed it. The
//! median in particular walks cumulative bucket volume instead of a
//! flat sorted list, which matters when a handful of price points carry
//! thousands of trades.

use crate::aggregate::PriceVolumeMap;
use serde::Serialize;

/// Summary statistics for one (item, window) pair
///
/// `num` is the total traded volume; all other fields are zero when no
/// trades fell inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceStats {
    pub avg: f64,
    pub stdev: f64,
    pub num: u64,
    pub med: f64,
    pub min: f64,
    pub max: f64,
}

impl PriceStats {
    pub fn zeroed() -> Self {
        Self {
            avg: 0.0,
            stdev: 0.0,
            num: 0,
            med: 0.0,
            min: 0.0,
            max: 0.0,
        }
    }
}

/// Compute count, mean, population standard deviation, weighted median
/// and price extremes from the bucketed volumes.
pub fn compute_stats(volumes: &PriceVolumeMap) -> PriceStats {
    let num: u64 = volumes.values().sum();
    if num == 0 {
        return PriceStats::zeroed();
    }

    let total: f64 = volumes.iter().map(|(price, &n)| price.0 * n as f64).sum();
    let avg = total / num as f64;

    let sum_sq_diff: f64 = volumes
        .iter()
        .map(|(price, &n)| n as f64 * (price.0 - avg).powi(2))
        .sum();
    let stdev = (sum_sq_diff / num as f64).sqrt();

    // BTreeMap iterates in ascending price order.
    let min = volumes.keys().next().map(|p| p.0).unwrap_or(0.0);
    let max = volumes.keys().next_back().map(|p| p.0).unwrap_or(0.0);

    PriceStats {
        avg,
        stdev,
        num,
        med: weighted_median(volumes, num),
        min,
        max,
    }
}

/// Exact median over bucketed values by cumulative frequency.
///
/// Walks buckets in ascending price order; the first bucket whose
/// running volume reaches `midpoint = (num + 1) / 2` holds the median.
/// When the running volume lands exactly on the lower middle rank of an
/// even count, the median sits between this bucket's price and the
/// next (the bucket's own price if it happens to be the last).
fn weighted_median(volumes: &PriceVolumeMap, num: u64) -> f64 {
    let midpoint = (num as f64 + 1.0) / 2.0;
    let lower_mid = (num + 1) / 2;

    let mut running = 0u64;
    let mut buckets = volumes.iter().peekable();

    while let Some((price, &amount)) = buckets.next() {
        running += amount;

        if running as f64 >= midpoint {
            return price.0;
        }

        if running == lower_mid {
            return match buckets.peek() {
                Some((next, _)) => (price.0 + next.0) / 2.0,
                None => price.0,
            };
        }
    }

    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Price;

    fn volumes(buckets: &[(f64, u64)]) -> PriceVolumeMap {
        buckets.iter().map(|&(p, n)| (Price(p), n)).collect()
    }

    /// Classical median over the flat expansion of the buckets.
    fn flat_median(buckets: &[(f64, u64)]) -> f64 {
        let mut flat: Vec<f64> = Vec::new();
        for &(price, n) in buckets {
            flat.extend(std::iter::repeat(price).take(n as usize));
        }
        flat.sort_by(|a, b| a.total_cmp(b));

        let n = flat.len();
        if n == 0 {
            0.0
        } else if n % 2 == 1 {
            flat[n / 2]
        } else {
            (flat[n / 2 - 1] + flat[n / 2]) / 2.0
        }
    }

    #[test]
    fn test_empty_map_is_all_zero() {
        let stats = compute_stats(&PriceVolumeMap::new());
        assert_eq!(stats, PriceStats::zeroed());
    }

    #[test]
    fn test_worked_example() {
        // 2 sold at 10, 3 sold at 20: num=5, avg=16, med=20 (rank 3 of
        // 5 lands in the second bucket), min=10, max=20.
        let stats = compute_stats(&volumes(&[(10.0, 2), (20.0, 3)]));

        assert_eq!(stats.num, 5);
        assert_eq!(stats.avg, 16.0);
        assert_eq!(stats.med, 20.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 20.0);
    }

    #[test]
    fn test_population_stdev() {
        // Trades: 10, 10, 20, 20. avg=15, variance=25, stdev=5.
        let stats = compute_stats(&volumes(&[(10.0, 2), (20.0, 2)]));
        assert_eq!(stats.avg, 15.0);
        assert!((stats.stdev - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_bucket() {
        let stats = compute_stats(&volumes(&[(7.5, 4)]));
        assert_eq!(stats.num, 4);
        assert_eq!(stats.avg, 7.5);
        assert_eq!(stats.stdev, 0.0);
        assert_eq!(stats.med, 7.5);
        assert_eq!(stats.min, 7.5);
        assert_eq!(stats.max, 7.5);
    }

    #[test]
    fn test_even_count_median_between_buckets() {
        // Trades: 10, 20 -> median 15.
        let stats = compute_stats(&volumes(&[(10.0, 1), (20.0, 1)]));
        assert_eq!(stats.med, 15.0);

        // Trades: 10, 10, 20, 30 -> middle ranks are 10 and 20.
        let stats = compute_stats(&volumes(&[(10.0, 2), (20.0, 1), (30.0, 1)]));
        assert_eq!(stats.med, 15.0);
    }

    #[test]
    fn test_median_matches_flat_reference() {
        let cases: &[&[(f64, u64)]] = &[
            &[(5.0, 1)],
            &[(5.0, 1), (9.0, 2)],
            &[(1.0, 3), (2.0, 3)],
            &[(1.0, 1), (2.0, 1), (3.0, 1), (4.0, 1)],
            &[(10.0, 2), (20.0, 3)],
            &[(3.0, 7), (8.0, 1), (12.0, 4)],
            &[(0.5, 10), (1.5, 10)],
            &[(2.0, 1), (4.0, 5), (6.0, 2), (8.0, 8)],
        ];

        for buckets in cases {
            let stats = compute_stats(&volumes(buckets));
            assert_eq!(
                stats.med,
                flat_median(buckets),
                "median mismatch for {:?}",
                buckets
            );
        }
    }

    #[test]
    fn test_median_bounded_by_extremes() {
        let cases: &[&[(f64, u64)]] = &[
            &[(1.0, 1), (100.0, 1)],
            &[(2.5, 4), (3.5, 1), (9.0, 9)],
            &[(10.0, 2), (20.0, 3), (30.0, 5)],
        ];

        for buckets in cases {
            let stats = compute_stats(&volumes(buckets));
            assert!(stats.min <= stats.med && stats.med <= stats.max);
        }
    }

    #[test]
    fn test_order_independence() {
        let ascending = volumes(&[(1.0, 2), (2.0, 3), (3.0, 4)]);
        let descending: PriceVolumeMap = [(3.0, 4), (2.0, 3), (1.0, 2)]
            .iter()
            .map(|&(p, n)| (Price(p), n))
            .collect();

        assert_eq!(compute_stats(&ascending), compute_stats(&descending));
    }
}
