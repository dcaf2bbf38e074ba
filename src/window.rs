//! Time window planning for historical aggregation

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc};

/// Time unit used to align and size an aggregation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hour,
    Day,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "h",
            Granularity::Day => "d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "h" | "hour" => Some(Granularity::Hour),
            "d" | "day" => Some(Granularity::Day),
            _ => None,
        }
    }

    fn span(&self, units: u32) -> Duration {
        match self {
            Granularity::Hour => Duration::hours(units as i64),
            Granularity::Day => Duration::days(units as i64),
        }
    }

    /// Position of `at` within the unit's natural cycle (hour of day,
    /// day of week counted from Sunday).
    fn unit_value(&self, at: DateTime<Utc>) -> u32 {
        match self {
            Granularity::Hour => at.hour(),
            Granularity::Day => at.weekday().num_days_from_sunday(),
        }
    }

    fn truncate(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let time = match self {
            Granularity::Hour => NaiveTime::from_hms_opt(at.hour(), 0, 0),
            Granularity::Day => NaiveTime::from_hms_opt(0, 0, 0),
        };
        at.date_naive().and_time(time.unwrap_or_default()).and_utc()
    }
}

/// Half-open time interval `[start, end)` over which trade statistics
/// are aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Plan the window ending `offset` periods in the past, anchored to
/// period multiples of the unit cycle.
///
/// `period` must be positive (validated by `Config::from_env`).
pub fn plan_window(granularity: Granularity, period: u32, offset: u32) -> Window {
    plan_window_at(granularity, period, offset, Utc::now())
}

/// Deterministic variant of [`plan_window`] with an explicit "now".
///
/// Rolls `now` back to the start of the current period, then back a
/// further `offset * period` units, and truncates to the start of the
/// granularity unit.
pub fn plan_window_at(
    granularity: Granularity,
    period: u32,
    offset: u32,
    now: DateTime<Utc>,
) -> Window {
    let rollback = granularity.unit_value(now) % period;
    let anchored = now - granularity.span(rollback) - granularity.span(offset * period);
    let start = granularity.truncate(anchored);

    Window {
        start,
        end: start + granularity.span(period),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_hourly_window_alignment() {
        // 14:37 with 4h periods: current period starts at 12:00,
        // offset 1 rolls back to [08:00, 12:00).
        let now = at(2024, 1, 10, 14, 37);
        let window = plan_window_at(Granularity::Hour, 4, 1, now);

        assert_eq!(window.start, at(2024, 1, 10, 8, 0));
        assert_eq!(window.end, at(2024, 1, 10, 12, 0));
    }

    #[test]
    fn test_window_length_matches_period() {
        let now = at(2024, 3, 5, 9, 15);
        for period in [1, 2, 4, 6, 12] {
            let window = plan_window_at(Granularity::Hour, period, 1, now);
            assert_eq!(window.end - window.start, Duration::hours(period as i64));
        }
    }

    #[test]
    fn test_determinism() {
        let now = at(2024, 6, 1, 23, 59);
        let a = plan_window_at(Granularity::Hour, 4, 2, now);
        let b = plan_window_at(Granularity::Hour, 4, 2, now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_offset_shifts_whole_periods() {
        let now = at(2024, 1, 10, 14, 0);
        let near = plan_window_at(Granularity::Hour, 4, 1, now);
        let far = plan_window_at(Granularity::Hour, 4, 3, now);
        assert_eq!(near.start - far.start, Duration::hours(8));
    }

    #[test]
    fn test_offset_zero_is_current_period() {
        let now = at(2024, 1, 10, 14, 37);
        let window = plan_window_at(Granularity::Hour, 4, 0, now);
        assert_eq!(window.start, at(2024, 1, 10, 12, 0));
        assert!(window.contains(now));
    }

    #[test]
    fn test_daily_window_truncates_to_midnight() {
        // 2024-01-10 is a Wednesday (weekday value 3); period 7 keeps
        // weeks anchored to Sunday.
        let now = at(2024, 1, 10, 14, 37);
        let window = plan_window_at(Granularity::Day, 7, 1, now);

        assert_eq!(window.start, at(2023, 12, 31, 0, 0));
        assert_eq!(window.end, at(2024, 1, 7, 0, 0));
    }

    #[test]
    fn test_contains_is_half_open() {
        let now = at(2024, 1, 10, 14, 0);
        let window = plan_window_at(Granularity::Hour, 4, 1, now);
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_granularity_parse_round_trip() {
        assert_eq!(Granularity::parse("h"), Some(Granularity::Hour));
        assert_eq!(Granularity::parse("day"), Some(Granularity::Day));
        assert_eq!(Granularity::parse("w"), None);
        assert_eq!(Granularity::parse(Granularity::Hour.as_str()), Some(Granularity::Hour));
    }
}
