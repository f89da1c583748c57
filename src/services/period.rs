//! Period resolution
//!
//! Turns a period label into a day count and the concrete date windows that
//! budgets and analytics work over.

use chrono::{DateTime, Utc};

use crate::error::{SpendError, SpendResult};
use crate::models::{BudgetWindow, Period};

/// Stateless mapping from period labels to windows
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodResolver;

impl PeriodResolver {
    /// Parse a label; only `weekly`, `monthly` and `yearly` are accepted
    pub fn resolve(label: &str) -> SpendResult<Period> {
        label
            .parse::<Period>()
            .map_err(|e| SpendError::InvalidPeriod(e.0))
    }

    /// 7, 30 or 365
    pub fn day_count(label: &str) -> SpendResult<i64> {
        Ok(Self::resolve(label)?.day_count())
    }

    /// Budget window opening at `start`
    pub fn window_from(start: DateTime<Utc>, period: Period) -> BudgetWindow {
        BudgetWindow::starting_at(start, period)
    }

    /// Analytics window covering the last `period` up to and including `now`
    pub fn trailing_window(now: DateTime<Utc>, period: Period) -> BudgetWindow {
        BudgetWindow::ending_at(now, period)
    }

    /// Same-length window immediately before `window`
    pub fn previous_window(window: BudgetWindow) -> BudgetWindow {
        window.preceding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_day_count_per_label() {
        assert_eq!(PeriodResolver::day_count("weekly").unwrap(), 7);
        assert_eq!(PeriodResolver::day_count("monthly").unwrap(), 30);
        assert_eq!(PeriodResolver::day_count("yearly").unwrap(), 365);
    }

    #[test]
    fn test_unknown_label_is_invalid_period() {
        for label in ["daily", "", "Weekly", "month"] {
            let err = PeriodResolver::day_count(label).unwrap_err();
            assert!(matches!(err, SpendError::InvalidPeriod(ref l) if l == label));
        }
    }

    #[test]
    fn test_windows() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 18, 0, 0).unwrap();

        let budget = PeriodResolver::window_from(now, Period::Weekly);
        assert_eq!(budget.start, now);
        assert_eq!(budget.end, now + Duration::days(7));

        let trailing = PeriodResolver::trailing_window(now, Period::Monthly);
        assert_eq!(trailing.start, now - Duration::days(30));
        assert_eq!(trailing.end, now);

        let previous = PeriodResolver::previous_window(trailing);
        assert!(previous.end < trailing.start);
        assert!(!previous.contains(trailing.start));
    }
}
