//! Expense analytics
//!
//! Read-only statistics over a trailing window: the last 7, 30 or 365 days
//! up to and including "now". Nothing here mutates budgets.
//!
//! With no expenses in the window `average_expense_amount` is `0.0` and
//! `largest`/`smallest` are `None`; it never divides by zero.

use serde::Serialize;

use crate::context::{Clock, RequestContext};
use crate::error::{SpendError, SpendResult};
use crate::models::{BudgetWindow, CategoryFilter, CategoryId, Expense, Money, Period};
use crate::storage::Store;

use super::period::PeriodResolver;

/// Relative change that still counts as "stable", in percent
pub const STABLE_BAND_PERCENT: f64 = 5.0;

/// Figures computed over one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseSummary {
    pub total: Money,
    pub count: usize,
    /// `total / day_count(period)`, in major units
    pub average_per_day: f64,
    /// `total / count`, in major units; `0.0` when `count == 0`
    pub average_expense_amount: f64,
    pub largest: Option<Expense>,
    pub smallest: Option<Expense>,
}

/// Statistics for one category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryAnalytics {
    pub category_id: CategoryId,
    pub category_name: String,
    pub period: Period,
    pub window: BudgetWindow,
    #[serde(flatten)]
    pub summary: ExpenseSummary,
}

/// Statistics across all of a user's categories
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseAnalytics {
    pub period: Period,
    pub window: BudgetWindow,
    #[serde(flatten)]
    pub summary: ExpenseSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increasing => write!(f, "increasing"),
            Self::Decreasing => write!(f, "decreasing"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

/// Current window compared with the one before it
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseTrend {
    pub period: Period,
    pub current_window: BudgetWindow,
    pub previous_window: BudgetWindow,
    pub current_total: Money,
    pub previous_total: Money,
    /// Percent change; `None` when the previous window had no spending
    pub growth_rate: Option<f64>,
    pub direction: TrendDirection,
}

/// Compute the summary of `expenses` for a window of `period`.
///
/// `expenses` is expected in window order (oldest first); ties for
/// largest/smallest go to the earliest one.
pub fn summarize(expenses: &[Expense], period: Period) -> SpendResult<ExpenseSummary> {
    let total = total_of(expenses)?;
    let count = expenses.len();

    let average_expense_amount = if count == 0 {
        0.0
    } else {
        total.to_major() / count as f64
    };

    let mut largest: Option<&Expense> = None;
    let mut smallest: Option<&Expense> = None;
    for expense in expenses {
        if largest.map_or(true, |l| expense.amount > l.amount) {
            largest = Some(expense);
        }
        if smallest.map_or(true, |s| expense.amount < s.amount) {
            smallest = Some(expense);
        }
    }

    Ok(ExpenseSummary {
        total,
        count,
        average_per_day: total.to_major() / period.day_count() as f64,
        average_expense_amount,
        largest: largest.cloned(),
        smallest: smallest.cloned(),
    })
}

fn total_of(expenses: &[Expense]) -> SpendResult<Money> {
    Money::checked_sum(expenses.iter().map(|e| e.amount)).ok_or_else(|| {
        SpendError::Inconsistency(format!(
            "{} expenses sum past the largest representable amount",
            expenses.len()
        ))
    })
}

/// Classify the change from `previous` to `current`
pub fn trend_between(current: Money, previous: Money) -> (Option<f64>, TrendDirection) {
    if previous.is_zero() {
        let direction = if current.is_positive() {
            TrendDirection::Increasing
        } else {
            TrendDirection::Stable
        };
        return (None, direction);
    }

    let rate = (current - previous).to_major() / previous.to_major() * 100.0;
    let direction = if rate > STABLE_BAND_PERCENT {
        TrendDirection::Increasing
    } else if rate < -STABLE_BAND_PERCENT {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };
    (Some(rate), direction)
}

/// Service for windowed expense statistics
pub struct AnalyticsEngine<'a, S: Store + ?Sized> {
    store: &'a S,
    clock: &'a dyn Clock,
}

impl<'a, S: Store + ?Sized> AnalyticsEngine<'a, S> {
    pub fn new(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub fn category_analytics(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
        period_label: &str,
    ) -> SpendResult<CategoryAnalytics> {
        let period = PeriodResolver::resolve(period_label)?;
        let category = self
            .store
            .get_category(ctx, category_id)?
            .ok_or_else(|| SpendError::category_not_found(category_id.to_string()))?;

        let window = PeriodResolver::trailing_window(self.clock.now(), period);
        let expenses =
            self.store
                .list_expenses_in_window(ctx, CategoryFilter::Only(category_id), window)?;

        tracing::debug!(
            owner = %ctx.owner(),
            category = %category_id,
            %period,
            count = expenses.len(),
            "category analytics"
        );

        Ok(CategoryAnalytics {
            category_id,
            category_name: category.name,
            period,
            window,
            summary: summarize(&expenses, period)?,
        })
    }

    pub fn user_expense_analytics(
        &self,
        ctx: &RequestContext,
        period_label: &str,
    ) -> SpendResult<ExpenseAnalytics> {
        let period = PeriodResolver::resolve(period_label)?;
        let window = PeriodResolver::trailing_window(self.clock.now(), period);
        let expenses = self
            .store
            .list_expenses_in_window(ctx, CategoryFilter::All, window)?;

        tracing::debug!(owner = %ctx.owner(), %period, count = expenses.len(), "user analytics");

        Ok(ExpenseAnalytics {
            period,
            window,
            summary: summarize(&expenses, period)?,
        })
    }

    pub fn expense_trend(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
        period_label: &str,
    ) -> SpendResult<ExpenseTrend> {
        let period = PeriodResolver::resolve(period_label)?;
        if let CategoryFilter::Only(category_id) = filter {
            if self.store.get_category(ctx, category_id)?.is_none() {
                return Err(SpendError::category_not_found(category_id.to_string()));
            }
        }

        let current_window = PeriodResolver::trailing_window(self.clock.now(), period);
        let previous_window = PeriodResolver::previous_window(current_window);

        let current_total = self.total_in(ctx, filter, current_window)?;
        let previous_total = self.total_in(ctx, filter, previous_window)?;
        let (growth_rate, direction) = trend_between(current_total, previous_total);

        Ok(ExpenseTrend {
            period,
            current_window,
            previous_window,
            current_total,
            previous_total,
            growth_rate,
            direction,
        })
    }

    fn total_in(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
        window: BudgetWindow,
    ) -> SpendResult<Money> {
        total_of(&self.store.list_expenses_in_window(ctx, filter, window)?)
    }
}
