//! Named time windows for report filtering.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use vconnect_core_types::EventRecord;

/// A report's active time window. Named ranges run from their boundary up to
/// "now"; `Custom` is a caller-supplied closed interval; `All` disables
/// filtering entirely (and is the only range that admits records without a
/// parsable timestamp).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeRange {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    All,
}

impl TimeRange {
    /// Inclusive lower boundary of the window, relative to `now`.
    /// Weeks start on Monday.
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let midnight = Utc
            .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()?;
        match self {
            Self::Today => Some(midnight),
            Self::ThisWeek => {
                let back = now.weekday().num_days_from_monday() as i64;
                Some(midnight - Duration::days(back))
            }
            Self::ThisMonth => Utc
                .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
                .single(),
            Self::ThisYear => Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0).single(),
            Self::Custom { start, .. } => Some(*start),
            Self::All => None,
        }
    }

    /// Whether a record timestamp falls inside the window. Missing
    /// timestamps match only `All`.
    pub fn contains(&self, timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if matches!(self, Self::All) {
            return true;
        }
        let Some(ts) = timestamp else {
            return false;
        };
        match self {
            Self::Custom { start, end } => *start <= ts && ts <= *end,
            _ => match self.start(now) {
                Some(start) => start <= ts && ts <= now,
                None => false,
            },
        }
    }

    /// Filters an event snapshot down to the window. Returns owned clones so
    /// callers can aggregate without holding a borrow on the cache snapshot.
    pub fn filter(&self, events: &[EventRecord], now: DateTime<Utc>) -> Vec<EventRecord> {
        events
            .iter()
            .filter(|event| self.contains(event.created_at, now))
            .cloned()
            .collect()
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().replace(' ', "-").as_str() {
            "today" | "this-day" => Ok(Self::Today),
            "this-week" | "week" => Ok(Self::ThisWeek),
            "this-month" | "month" => Ok(Self::ThisMonth),
            "this-year" | "year" => Ok(Self::ThisYear),
            "all" => Ok(Self::All),
            other => Err(format!("unrecognized time range '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn today_starts_at_midnight() {
        let now = at(2024, 6, 15, 14, 30);
        let range = TimeRange::Today;
        assert!(range.contains(Some(at(2024, 6, 15, 0, 0)), now));
        assert!(range.contains(Some(now), now));
        assert!(!range.contains(Some(at(2024, 6, 14, 23, 59)), now));
        assert!(!range.contains(Some(at(2024, 6, 15, 15, 0)), now));
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-06-15 is a Saturday; the week began Monday 2024-06-10.
        let now = at(2024, 6, 15, 12, 0);
        assert_eq!(
            TimeRange::ThisWeek.start(now),
            Some(at(2024, 6, 10, 0, 0))
        );
        assert!(TimeRange::ThisWeek.contains(Some(at(2024, 6, 10, 0, 0)), now));
        assert!(!TimeRange::ThisWeek.contains(Some(at(2024, 6, 9, 23, 59)), now));
    }

    #[test]
    fn month_and_year_boundaries() {
        let now = at(2024, 6, 15, 12, 0);
        assert_eq!(TimeRange::ThisMonth.start(now), Some(at(2024, 6, 1, 0, 0)));
        assert_eq!(TimeRange::ThisYear.start(now), Some(at(2024, 1, 1, 0, 0)));
        assert!(TimeRange::ThisYear.contains(Some(at(2024, 1, 1, 0, 0)), now));
        assert!(!TimeRange::ThisYear.contains(Some(at(2023, 12, 31, 23, 59)), now));
    }

    #[test]
    fn custom_interval_is_closed() {
        let start = at(2024, 3, 1, 0, 0);
        let end = at(2024, 3, 31, 23, 59);
        let range = TimeRange::Custom { start, end };
        let now = at(2024, 6, 15, 12, 0);
        assert!(range.contains(Some(start), now));
        assert!(range.contains(Some(end), now));
        assert!(!range.contains(Some(at(2024, 4, 1, 0, 0)), now));
    }

    #[test]
    fn missing_timestamps_only_match_all() {
        let now = at(2024, 6, 15, 12, 0);
        for range in [
            TimeRange::Today,
            TimeRange::ThisWeek,
            TimeRange::ThisMonth,
            TimeRange::ThisYear,
        ] {
            assert!(!range.contains(None, now), "{range:?} matched a missing timestamp");
        }
        assert!(TimeRange::All.contains(None, now));
    }

    #[test]
    fn parses_cli_tokens() {
        assert_eq!("This Week".parse::<TimeRange>(), Ok(TimeRange::ThisWeek));
        assert_eq!("today".parse::<TimeRange>(), Ok(TimeRange::Today));
        assert!("fortnight".parse::<TimeRange>().is_err());
    }
}
