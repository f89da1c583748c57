//! Budget periods and date windows
//!
//! A period is a fixed number of days, not a calendar unit: "monthly" is
//! always 30 days and "yearly" always 365, regardless of where the window
//! starts. Every window comparison in the crate relies on this.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length label of a budget or analytics window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Weekly, Period::Monthly, Period::Yearly];

    /// Number of days covered by one window of this period
    pub const fn day_count(&self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Yearly => 365,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::days(self.day_count())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = PeriodParseError;

    /// Labels are matched exactly; "Monthly" or "daily" are rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PeriodParseError(s.to_string()))
    }
}

/// Error returned for an unrecognized period label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodParseError(pub String);

impl fmt::Display for PeriodParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown period: {}", self.0)
    }
}

impl std::error::Error for PeriodParseError {}

/// A closed time range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BudgetWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window beginning at `start` and lasting one `period`
    pub fn starting_at(start: DateTime<Utc>, period: Period) -> Self {
        Self {
            start,
            end: start + period.duration(),
        }
    }

    /// Window of one `period` that ends at `end`
    pub fn ending_at(end: DateTime<Utc>, period: Period) -> Self {
        Self {
            start: end - period.duration(),
            end,
        }
    }

    /// Both bounds are inclusive
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// The same-length window that closes just before this one opens
    pub fn preceding(&self) -> Self {
        let length = self.end - self.start;
        let end = self.start - Duration::milliseconds(1);
        Self {
            start: end - length,
            end,
        }
    }
}

impl fmt::Display for BudgetWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_day_counts() {
        assert_eq!(Period::Weekly.day_count(), 7);
        assert_eq!(Period::Monthly.day_count(), 30);
        assert_eq!(Period::Yearly.day_count(), 365);
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!("weekly".parse::<Period>(), Ok(Period::Weekly));
        assert_eq!("yearly".parse::<Period>(), Ok(Period::Yearly));
        assert!("daily".parse::<Period>().is_err());
        assert!("Monthly".parse::<Period>().is_err());
        assert!("".parse::<Period>().is_err());
    }

    #[test]
    fn test_monthly_window_ignores_calendar() {
        // February: a calendar month would end on Mar 1, the fixed window on Mar 3
        let window = BudgetWindow::starting_at(at(2025, 2, 1), Period::Monthly);
        assert_eq!(window.end, at(2025, 3, 3));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let window = BudgetWindow::starting_at(at(2025, 1, 1), Period::Weekly);
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end + Duration::seconds(1)));
        assert!(!window.contains(window.start - Duration::seconds(1)));
    }

    #[test]
    fn test_preceding_does_not_overlap() {
        let window = BudgetWindow::ending_at(at(2025, 1, 15), Period::Weekly);
        let prev = window.preceding();
        assert!(prev.end < window.start);
        assert_eq!(prev.end - prev.start, window.end - window.start);
    }

    #[test]
    fn test_serde_label() {
        assert_eq!(serde_json::to_string(&Period::Monthly).unwrap(), "\"monthly\"");
    }
}
