//! Budget model
//!
//! A budget caps spending in one category over a fixed-length window. Its
//! `spent` field is a running total kept equal to the sum of the owner's
//! expenses in that category whose date falls inside the window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BudgetId, CategoryId, UserId};
use super::money::Money;
use super::period::{BudgetWindow, Period};

/// A spending budget for one category and window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub owner_id: UserId,
    pub category_id: CategoryId,

    /// Target amount for the window
    pub amount: Money,

    /// Sum of matching expenses; never negative
    pub spent: Money,

    pub period: Period,

    /// Window start (inclusive)
    pub start: DateTime<Utc>,

    /// Window end (inclusive), always `start + period.day_count()` days
    pub end: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Number of decrements that would have driven `spent` below zero
    #[serde(default)]
    pub clamp_count: u32,
}

impl Budget {
    /// Create a budget whose window opens at `start`, with nothing spent yet
    pub fn new(
        owner_id: UserId,
        category_id: CategoryId,
        amount: Money,
        period: Period,
        start: DateTime<Utc>,
    ) -> Self {
        let window = BudgetWindow::starting_at(start, period);
        Self {
            id: BudgetId::new(),
            owner_id,
            category_id,
            amount,
            spent: Money::zero(),
            period,
            start: window.start,
            end: window.end,
            created_at: start,
            updated_at: start,
            clamp_count: 0,
        }
    }

    pub fn window(&self) -> BudgetWindow {
        BudgetWindow::new(self.start, self.end)
    }

    /// Whether an expense dated `date` counts toward this budget
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.window().contains(date)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end
    }

    /// Switch to a different period, keeping the window start
    pub fn change_period(&mut self, period: Period, now: DateTime<Utc>) {
        self.period = period;
        self.end = BudgetWindow::starting_at(self.start, period).end;
        self.updated_at = now;
    }

    pub fn set_amount(&mut self, amount: Money, now: DateTime<Utc>) {
        self.amount = amount;
        self.updated_at = now;
    }

    /// Overwrite `spent` with a recomputed total
    pub fn set_spent(&mut self, spent: Money, now: DateTime<Utc>) {
        self.spent = spent;
        self.updated_at = now;
    }

    /// Apply an incremental change to `spent`, flooring the result at zero.
    /// The budget is left untouched if the new total does not fit.
    pub fn apply_delta(
        &mut self,
        delta: Money,
        now: DateTime<Utc>,
    ) -> Result<SpentAdjustment, BudgetValidationError> {
        let before = self.spent;
        let raw = before
            .checked_add(delta)
            .ok_or(BudgetValidationError::SpentOverflow { spent: before, delta })?;
        let clamped = raw.is_negative();

        self.spent = if clamped { Money::zero() } else { raw };
        if clamped {
            self.clamp_count += 1;
        }
        self.updated_at = now;

        Ok(SpentAdjustment {
            budget_id: self.id,
            delta,
            before,
            after: self.spent,
            clamped,
            clamp_count: self.clamp_count,
        })
    }

    /// Target minus spent; negative once overspent
    pub fn remaining(&self) -> Money {
        self.amount - self.spent
    }

    pub fn spent_percentage(&self) -> f64 {
        if self.amount.is_zero() {
            return 0.0;
        }
        self.spent.cents() as f64 / self.amount.cents() as f64 * 100.0
    }

    /// Whole days until the window closes, zero once expired
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.end - now).num_days().max(0)
    }

    pub fn validate(&self) -> Result<(), BudgetValidationError> {
        if !self.amount.is_positive() {
            return Err(BudgetValidationError::NonPositiveAmount(self.amount));
        }

        if self.amount > Money::MAX_AMOUNT {
            return Err(BudgetValidationError::AmountTooLarge(self.amount));
        }

        if self.spent.is_negative() {
            return Err(BudgetValidationError::NegativeSpent(self.spent));
        }

        if self.end != BudgetWindow::starting_at(self.start, self.period).end {
            return Err(BudgetValidationError::WindowMismatch);
        }

        Ok(())
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} of {}", self.period, self.spent, self.amount)
    }
}

/// Outcome of applying one delta to one budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentAdjustment {
    pub budget_id: BudgetId,
    pub delta: Money,
    pub before: Money,
    pub after: Money,

    /// The floor at zero kicked in
    pub clamped: bool,

    /// Clamp count of the budget after this adjustment
    pub clamp_count: u32,
}

/// Coarse budget health for status views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetHealth {
    Ok,
    Warning,
    Exceeded,
}

impl fmt::Display for BudgetHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Warning => write!(f, "warning"),
            Self::Exceeded => write!(f, "exceeded"),
        }
    }
}

/// Read-time view of a budget: derived figures evaluated against "now"
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub remaining: Money,
    pub spent_percentage: f64,
    pub days_remaining: i64,
    pub expired: bool,
    pub health: BudgetHealth,
}

impl BudgetStatus {
    /// `warning_percent` is the spent percentage at which health turns to warning
    pub fn evaluate(budget: Budget, now: DateTime<Utc>, warning_percent: f64) -> Self {
        let spent_percentage = budget.spent_percentage();
        let health = if budget.spent > budget.amount {
            BudgetHealth::Exceeded
        } else if spent_percentage >= warning_percent {
            BudgetHealth::Warning
        } else {
            BudgetHealth::Ok
        };

        Self {
            remaining: budget.remaining(),
            days_remaining: budget.days_remaining(now),
            expired: budget.is_expired(now),
            spent_percentage,
            health,
            budget,
        }
    }
}

/// Validation errors for budgets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetValidationError {
    NonPositiveAmount(Money),
    AmountTooLarge(Money),
    NegativeSpent(Money),
    WindowMismatch,
    SpentOverflow { spent: Money, delta: Money },
}

impl fmt::Display for BudgetValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "Budget amount must be positive, got {}", amount)
            }
            Self::AmountTooLarge(amount) => write!(
                f,
                "Budget amount {} exceeds the maximum of {}",
                amount,
                Money::MAX_AMOUNT
            ),
            Self::NegativeSpent(spent) => write!(f, "Spent amount cannot be negative ({})", spent),
            Self::WindowMismatch => write!(f, "Budget window does not match its period"),
            Self::SpentOverflow { spent, delta } => {
                write!(f, "Adding {} to spent amount {} overflows", delta, spent)
            }
        }
    }
}

impl std::error::Error for BudgetValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn budget(amount: i64) -> Budget {
        Budget::new(
            UserId::new("alice").unwrap(),
            CategoryId::new(),
            Money::from_units(amount),
            Period::Monthly,
            start(),
        )
    }

    #[test]
    fn test_new_budget_window() {
        let b = budget(500);
        assert_eq!(b.spent, Money::zero());
        assert_eq!(b.end, start() + Duration::days(30));
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_apply_delta_clamps_at_zero() {
        let mut b = budget(500);
        let add = b.apply_delta(Money::from_units(20), start()).unwrap();
        assert!(!add.clamped);
        assert_eq!(add.after, Money::from_units(20));

        let sub = b.apply_delta(Money::from_units(-50), start()).unwrap();
        assert!(sub.clamped);
        assert_eq!(sub.before, Money::from_units(20));
        assert_eq!(sub.after, Money::zero());
        assert_eq!(b.spent, Money::zero());
        assert_eq!(b.clamp_count, 1);
    }

    #[test]
    fn test_apply_delta_overflow_is_rejected() {
        let mut b = budget(500);
        b.set_spent(Money::from_cents(i64::MAX - 1), start());

        let later = start() + Duration::hours(1);
        let err = b.apply_delta(Money::from_cents(2), later).unwrap_err();
        assert!(matches!(err, BudgetValidationError::SpentOverflow { .. }));
        assert_eq!(b.spent, Money::from_cents(i64::MAX - 1));
        assert_eq!(b.updated_at, start());
    }

    #[test]
    fn test_change_period_moves_end() {
        let mut b = budget(500);
        let later = start() + Duration::days(2);
        b.change_period(Period::Weekly, later);
        assert_eq!(b.end, start() + Duration::days(7));
        assert_eq!(b.updated_at, later);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_status_health() {
        let now = start() + Duration::days(10);

        let mut b = budget(100);
        b.set_spent(Money::from_units(50), now);
        let status = BudgetStatus::evaluate(b.clone(), now, 80.0);
        assert_eq!(status.health, BudgetHealth::Ok);
        assert_eq!(status.remaining, Money::from_units(50));
        assert_eq!(status.days_remaining, 20);
        assert!(!status.expired);

        b.set_spent(Money::from_units(80), now);
        assert_eq!(BudgetStatus::evaluate(b.clone(), now, 80.0).health, BudgetHealth::Warning);

        b.set_spent(Money::from_units(101), now);
        let status = BudgetStatus::evaluate(b, now, 80.0);
        assert_eq!(status.health, BudgetHealth::Exceeded);
        assert_eq!(status.remaining, Money::from_units(-1));
    }

    #[test]
    fn test_expiry_is_derived() {
        let b = budget(100);
        assert!(!b.is_expired(b.end));
        assert!(b.is_expired(b.end + Duration::seconds(1)));
        assert_eq!(b.days_remaining(b.end + Duration::days(3)), 0);
    }

    #[test]
    fn test_validation_rejects_bad_amount() {
        let b = budget(0);
        assert_eq!(
            b.validate(),
            Err(BudgetValidationError::NonPositiveAmount(Money::zero()))
        );

        let mut huge = budget(1);
        huge.set_amount(Money::MAX_AMOUNT + Money::from_cents(1), start());
        assert!(matches!(
            huge.validate(),
            Err(BudgetValidationError::AmountTooLarge(_))
        ));
    }
}
