use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Selected historical window as `(start, end)` epoch seconds, `start <= end`.
///
/// Serialized as a two-element array, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct TimeRange {
    start: i64,
    end: i64,
}

impl TimeRange {
    /// Creates a range from two epoch timestamps in any order.
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Creates a range covering the whole of the given (inclusive) days.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        let to_epoch = |d: NaiveDate| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
        Self::new(to_epoch(start), to_epoch(end))
    }

    /// The range `[now - 1 day, now]` a fresh dashboard starts with.
    pub fn last_day(now: DateTime<Utc>) -> Self {
        let now = now.timestamp();
        Self::new(now - SECONDS_PER_DAY, now)
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// A zeroed range means the dashboard never selected one.
    pub fn is_unset(&self) -> bool {
        self.start == 0
    }

    /// Clamps both ends into `[now - max_days, now]`.
    pub fn clamped(&self, now: DateTime<Utc>, max_days: u32) -> Self {
        let max = now.timestamp();
        let min = history_start(now, max_days);
        Self::new(self.start.clamp(min, max), self.end.clamp(min, max))
    }

    pub fn start_date(&self) -> NaiveDate {
        epoch_to_date(self.start)
    }

    pub fn end_date(&self) -> NaiveDate {
        epoch_to_date(self.end)
    }

    /// Number of calendar days requested from the archive (both ends inclusive).
    pub fn days(&self) -> i64 {
        (self.end_date() - self.start_date()).num_days() + 1
    }
}

/// Epoch seconds of `now - max_days`, saturating at the earliest
/// representable instant.
pub fn history_start(now: DateTime<Utc>, max_days: u32) -> i64 {
    Duration::try_days(i64::from(max_days))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
        .timestamp()
}

fn epoch_to_date(secs: i64) -> NaiveDate {
    DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .date_naive()
}

impl From<(i64, i64)> for TimeRange {
    fn from((start, end): (i64, i64)) -> Self {
        Self::new(start, end)
    }
}

impl From<TimeRange> for (i64, i64) {
    fn from(range: TimeRange) -> Self {
        (range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_orders_bounds() {
        let range = TimeRange::new(200, 100);
        assert_eq!(range.start(), 100);
        assert_eq!(range.end(), 200);
    }

    #[test]
    fn test_last_day() {
        let range = TimeRange::last_day(now());
        assert_eq!(range.start_date(), NaiveDate::from_ymd_opt(2024, 6, 14).unwrap());
        assert_eq!(range.end_date(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(range.days(), 2);
    }

    #[test]
    fn test_clamped_to_history_window() {
        let way_back = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap().timestamp();
        let future = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap().timestamp();
        let range = TimeRange::new(way_back, future).clamped(now(), 30);
        assert_eq!(range.start_date(), NaiveDate::from_ymd_opt(2024, 5, 16).unwrap());
        assert_eq!(range.end(), now().timestamp());
    }

    #[test]
    fn test_serializes_as_pair() {
        let range = TimeRange::new(1, 2);
        assert_eq!(serde_json::to_string(&range).unwrap(), "[1,2]");
        let back: TimeRange = serde_json::from_str("[5,3]").unwrap();
        assert_eq!(back, TimeRange::new(3, 5));
    }

    #[test]
    fn test_default_is_unset() {
        assert!(TimeRange::default().is_unset());
        assert!(!TimeRange::last_day(now()).is_unset());
    }

    #[test]
    fn test_huge_history_window_saturates() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let start = history_start(now, u32::MAX);
        assert_eq!(start, DateTime::<Utc>::MIN_UTC.timestamp());

        let range = TimeRange::new(0, now.timestamp() + 5).clamped(now, u32::MAX);
        assert_eq!(range, TimeRange::new(0, now.timestamp()));
    }
}
