//! # Range Partitioning
//!
//! The metrics API answers at most [`MAX_DATAPOINTS`] samples per query. Longer
//! windows are cut into consecutive sub-ranges of `MAX_DATAPOINTS * interval`
//! seconds, queried one by one.

use crate::error::{
    CollectError,
    Result,
};
use chrono::{
    DateTime,
    TimeDelta,
    Utc,
};
use serde::Serialize;
use std::fmt;

/// Largest number of samples a single statistics query may return.
pub const MAX_DATAPOINTS: i64 = 1440;

/// Smallest granularity the metrics API supports, in seconds.
pub const MIN_GRANULARITY_SECONDS: u64 = 60;

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(CollectError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn empty_at(instant: DateTime<Utc>) -> Self {
        Self {
            start: instant,
            end: instant,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Caps the end at `limit`, never moving it before the start.
    pub fn clamp_end(self, limit: DateTime<Utc>) -> Self {
        Self {
            start: self.start,
            end: self.end.min(limit).max(self.start),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Sampling granularity in whole seconds, a positive multiple of
/// [`MIN_GRANULARITY_SECONDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SamplingInterval(u64);

impl SamplingInterval {
    pub fn new(seconds: u64) -> Result<Self> {
        if seconds == 0 || seconds % MIN_GRANULARITY_SECONDS != 0 || i64::try_from(seconds).is_err() {
            return Err(CollectError::InvalidInterval(seconds));
        }
        Ok(Self(seconds))
    }

    pub fn as_secs(&self) -> i64 {
        self.0 as i64
    }

    /// Longest span one query may cover at this granularity.
    pub fn max_query_span(&self) -> TimeDelta {
        TimeDelta::try_seconds(MAX_DATAPOINTS.saturating_mul(self.as_secs())).unwrap_or(TimeDelta::MAX)
    }
}

impl fmt::Display for SamplingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// True when `[start, end)` holds more samples than one query may return.
/// Exactly [`MAX_DATAPOINTS`] samples still fit.
pub fn exceeds_max_datapoints_threshold(start: DateTime<Utc>, end: DateTime<Utc>, interval: SamplingInterval) -> bool {
    let seconds_between = (end - start).num_seconds();
    seconds_between / interval.as_secs() > MAX_DATAPOINTS
}

/// Cuts `[start, end)` into contiguous ranges of at most
/// `MAX_DATAPOINTS * interval`. The last range may reach past `end`; clamp it
/// with [`TimeRange::clamp_end`] before querying.
pub fn partition(start: DateTime<Utc>, end: DateTime<Utc>, interval: SamplingInterval) -> Vec<TimeRange> {
    let span = interval.max_query_span();
    let mut ranges = Vec::new();

    let mut t = start;
    while t < end {
        let Some(next) = t.checked_add_signed(span) else {
            ranges.push(TimeRange { start: t, end });
            break;
        };
        ranges.push(TimeRange { start: t, end: next });
        t = next;
    }

    ranges
}

/// Query ranges for one window: the window itself when it fits in a single
/// query, otherwise its partition clamped to the window end.
pub fn query_ranges(window: TimeRange, interval: SamplingInterval) -> Vec<TimeRange> {
    if window.is_empty() {
        return Vec::new();
    }
    if !exceeds_max_datapoints_threshold(window.start, window.end, interval) {
        return vec![window];
    }
    partition(window.start, window.end, interval)
        .into_iter()
        .map(|range| range.clamp_end(window.end))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn minute() -> SamplingInterval {
        SamplingInterval::new(60).unwrap()
    }

    #[test]
    fn one_day_of_minutes_fits_a_single_query() {
        assert!(!exceeds_max_datapoints_threshold(at(1), at(2), minute()));

        let ranges = partition(at(1), at(2), minute());
        assert_eq!(ranges, vec![TimeRange::new(at(1), at(2)).unwrap()]);
    }

    #[test]
    fn two_days_of_minutes_split_into_two_full_days() {
        assert!(exceeds_max_datapoints_threshold(at(1), at(3), minute()));

        let ranges = partition(at(1), at(3), minute());
        assert_eq!(
            ranges,
            vec![
                TimeRange::new(at(1), at(2)).unwrap(),
                TimeRange::new(at(2), at(3)).unwrap(),
            ]
        );
        assert!(ranges[1].end() >= at(3));
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        let interval = SamplingInterval::new(300).unwrap();
        let start = at(1);
        let exact = start + TimeDelta::seconds(MAX_DATAPOINTS * 300);
        assert!(!exceeds_max_datapoints_threshold(start, exact, interval));
        assert!(exceeds_max_datapoints_threshold(
            start,
            exact + TimeDelta::seconds(300),
            interval
        ));
        assert!(!exceeds_max_datapoints_threshold(start, start, interval));
    }

    #[test]
    fn five_thousand_samples_need_four_queries() {
        let interval = minute();
        let start = at(1);
        let end = start + TimeDelta::seconds(5000 * 60);

        let ranges = partition(start, end, interval);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges.last().unwrap().end(), start + TimeDelta::seconds(4 * 1440 * 60));
    }

    #[test]
    fn partitions_are_contiguous_and_bounded() {
        let start = Utc.with_ymd_and_hms(2023, 6, 14, 7, 13, 20).unwrap();
        for interval_secs in [60, 120, 300, 3600] {
            let interval = SamplingInterval::new(interval_secs).unwrap();
            for span_secs in [1, 59, 86_399, 86_400, 86_401, 1_000_000, 9_999_999] {
                let end = start + TimeDelta::seconds(span_secs);
                let ranges = partition(start, end, interval);

                assert_eq!(ranges.first().unwrap().start(), start);
                assert!(ranges.last().unwrap().end() >= end);
                assert!(ranges.last().unwrap().start() < end);
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end(), pair[1].start());
                }
                for range in &ranges {
                    assert!(range.duration() <= interval.max_query_span());
                }
            }
        }
    }

    #[test]
    fn empty_span_has_no_partitions() {
        assert!(partition(at(2), at(2), minute()).is_empty());
        assert!(partition(at(3), at(2), minute()).is_empty());
    }

    #[test]
    fn query_ranges_clamp_to_the_window() {
        let window = TimeRange::new(at(1), at(3) + TimeDelta::hours(1)).unwrap();
        let ranges = query_ranges(window, minute());
        assert_eq!(
            ranges,
            vec![
                TimeRange::new(at(1), at(2)).unwrap(),
                TimeRange::new(at(2), at(3)).unwrap(),
                TimeRange::new(at(3), at(3) + TimeDelta::hours(1)).unwrap(),
            ]
        );

        let small = TimeRange::new(at(1), at(1) + TimeDelta::minutes(5)).unwrap();
        assert_eq!(query_ranges(small, minute()), vec![small]);
        assert!(query_ranges(TimeRange::new(at(1), at(1)).unwrap(), minute()).is_empty());
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(TimeRange::new(at(2), at(1)), Err(CollectError::InvalidRange { .. })));
        for seconds in [0, 1, 90] {
            assert!(matches!(
                SamplingInterval::new(seconds),
                Err(CollectError::InvalidInterval(s)) if s == seconds
            ));
        }
    }

    #[test]
    fn clamp_never_inverts_a_range() {
        let range = TimeRange::new(at(2), at(3)).unwrap();
        assert_eq!(range.clamp_end(at(4)), range);
        assert_eq!(range.clamp_end(at(1)).end(), at(2));
    }
}
