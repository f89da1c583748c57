//! Budget tracking
//!
//! Owns the budget lifecycle and the spent-amount invariant: a budget's
//! `spent` equals the sum of its owner's expenses in the same category whose
//! date falls inside the budget window.
//!
//! Expense writes keep the invariant incrementally through
//! [`BudgetTracker::on_expense_created`] and
//! [`BudgetTracker::on_expense_deleted`]. Creating a budget, changing its
//! period or reconciling it recomputes the figure from scratch.

use serde::Serialize;
use serde_json::json;

use crate::audit::{AuditEntry, EntityType};
use crate::context::{Clock, RequestContext};
use crate::error::{SpendError, SpendResult};
use crate::models::{
    Budget, BudgetId, BudgetStatus, CategoryFilter, CategoryId, Expense, Money, SpentAdjustment,
};
use crate::storage::Store;

use super::period::PeriodResolver;

/// Default spent percentage at which a budget reports "warning"
pub const DEFAULT_WARNING_PERCENT: f64 = 80.0;

/// Input for [`BudgetTracker::create_budget`]
#[derive(Debug, Clone)]
pub struct NewBudget {
    pub category_id: CategoryId,
    pub amount: Money,
    /// `weekly`, `monthly` or `yearly`
    pub period: String,
}

/// Partial update for [`BudgetTracker::update_budget`]
#[derive(Debug, Clone, Default)]
pub struct BudgetUpdate {
    pub amount: Option<Money>,
    pub period: Option<String>,
}

/// Result of a full recomputation
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub budget: Budget,
    pub before: Money,
    pub after: Money,
    /// `before - after`; zero when the stored figure was already right
    pub drift: Money,
}

/// Service for budgets and their spent totals
pub struct BudgetTracker<'a, S: Store + ?Sized> {
    store: &'a S,
    clock: &'a dyn Clock,
    warning_percent: f64,
}

impl<'a, S: Store + ?Sized> BudgetTracker<'a, S> {
    pub fn new(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            clock,
            warning_percent: DEFAULT_WARNING_PERCENT,
        }
    }

    pub fn with_warning_percent(mut self, warning_percent: f64) -> Self {
        self.warning_percent = warning_percent;
        self
    }

    /// Create a budget whose window opens now, then fill `spent` from the
    /// expenses already recorded in that window
    pub fn create_budget(&self, ctx: &RequestContext, new: NewBudget) -> SpendResult<Budget> {
        let period = PeriodResolver::resolve(&new.period)?;
        if !new.amount.is_positive() {
            return Err(SpendError::Validation(format!(
                "Budget amount must be positive, got {}",
                new.amount
            )));
        }

        let _gate = self.store.lock_writes(ctx)?;

        if self.store.get_category(ctx, new.category_id)?.is_none() {
            return Err(SpendError::category_not_found(new.category_id.to_string()));
        }

        let budget = Budget::new(
            ctx.owner().clone(),
            new.category_id,
            new.amount,
            period,
            self.clock.now(),
        );
        budget
            .validate()
            .map_err(|e| SpendError::Validation(e.to_string()))?;

        let budget = self.store.insert_budget(ctx, budget)?;
        self.store.record(AuditEntry::create(
            EntityType::Budget,
            budget.id.to_string(),
            Some(ctx.owner().to_string()),
            &budget,
        ))?;

        let budget = self.recompute(ctx, budget)?.budget;

        tracing::info!(
            owner = %ctx.owner(),
            budget = %budget.id,
            category = %budget.category_id,
            period = %budget.period,
            spent = budget.spent.cents(),
            "budget created"
        );
        Ok(budget)
    }

    /// Add a new expense to every budget it falls into
    pub fn on_expense_created(
        &self,
        ctx: &RequestContext,
        expense: &Expense,
    ) -> SpendResult<Vec<SpentAdjustment>> {
        self.adjust(ctx, expense, expense.amount)
    }

    /// Take a removed expense back out of every budget it fell into.
    ///
    /// Totals are floored at zero. A clamp means the budget had drifted
    /// below its expenses and is reported, never silently absorbed.
    pub fn on_expense_deleted(
        &self,
        ctx: &RequestContext,
        expense: &Expense,
    ) -> SpendResult<Vec<SpentAdjustment>> {
        self.adjust(ctx, expense, -expense.amount)
    }

    fn adjust(
        &self,
        ctx: &RequestContext,
        expense: &Expense,
        delta: Money,
    ) -> SpendResult<Vec<SpentAdjustment>> {
        let adjustments = self.store.apply_spent_delta(
            ctx,
            expense.category_id,
            expense.date,
            delta,
            self.clock.now(),
        )?;

        for adjustment in &adjustments {
            if adjustment.clamped {
                tracing::warn!(
                    owner = %ctx.owner(),
                    budget = %adjustment.budget_id,
                    expense = %expense.id,
                    before = adjustment.before.cents(),
                    delta = delta.cents(),
                    "spent amount clamped at zero"
                );
                if adjustment.clamp_count > 1 {
                    tracing::error!(
                        owner = %ctx.owner(),
                        budget = %adjustment.budget_id,
                        clamp_count = adjustment.clamp_count,
                        "budget clamped repeatedly; spent total is out of sync with its expenses"
                    );
                }
            } else {
                tracing::debug!(
                    budget = %adjustment.budget_id,
                    before = adjustment.before.cents(),
                    after = adjustment.after.cents(),
                    "spent adjusted"
                );
            }

            self.store.record(AuditEntry::update(
                EntityType::Budget,
                adjustment.budget_id.to_string(),
                Some(ctx.owner().to_string()),
                &json!({ "spent": adjustment.before.cents() }),
                &json!({ "spent": adjustment.after.cents(), "clamped": adjustment.clamped }),
            ))?;
        }

        Ok(adjustments)
    }

    pub fn get_budget(&self, ctx: &RequestContext, id: BudgetId) -> SpendResult<Budget> {
        self.store
            .get_budget(ctx, id)?
            .ok_or_else(|| SpendError::budget_not_found(id.to_string()))
    }

    pub fn list_budgets(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
    ) -> SpendResult<Vec<Budget>> {
        self.store.list_budgets(ctx, filter)
    }

    /// Delete a budget filed under `category_id`
    pub fn delete_budget(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
        id: BudgetId,
    ) -> SpendResult<Budget> {
        let _gate = self.store.lock_writes(ctx)?;

        let budget = self
            .store
            .get_budget(ctx, id)?
            .filter(|b| b.category_id == category_id)
            .ok_or_else(|| SpendError::budget_not_found(id.to_string()))?;

        self.store
            .delete_budget(ctx, id)?
            .ok_or_else(|| SpendError::budget_not_found(id.to_string()))?;

        self.store.record(AuditEntry::delete(
            EntityType::Budget,
            id.to_string(),
            Some(ctx.owner().to_string()),
            &budget,
        ))?;

        tracing::info!(owner = %ctx.owner(), budget = %id, "budget deleted");
        Ok(budget)
    }

    /// Change the target and/or period. A new period keeps the window start,
    /// moves the end and recomputes `spent`.
    pub fn update_budget(
        &self,
        ctx: &RequestContext,
        id: BudgetId,
        update: BudgetUpdate,
    ) -> SpendResult<Budget> {
        let period = update
            .period
            .as_deref()
            .map(PeriodResolver::resolve)
            .transpose()?;
        if let Some(amount) = update.amount {
            if !amount.is_positive() {
                return Err(SpendError::Validation(format!(
                    "Budget amount must be positive, got {}",
                    amount
                )));
            }
        }

        let _gate = self.store.lock_writes(ctx)?;

        let before = self.get_budget(ctx, id)?;
        let mut budget = before.clone();
        let now = self.clock.now();

        if let Some(amount) = update.amount {
            budget.set_amount(amount, now);
        }

        let period_changed = period.is_some_and(|p| p != budget.period);
        if let Some(period) = period {
            budget.change_period(period, now);
        }

        if period_changed {
            let spent = self.expected_spent(ctx, &budget)?;
            budget.set_spent(spent, now);
        }

        budget
            .validate()
            .map_err(|e| SpendError::Validation(e.to_string()))?;

        self.store
            .update_budget(ctx, budget.clone())?
            .ok_or_else(|| SpendError::budget_not_found(id.to_string()))?;

        self.store.record(AuditEntry::update(
            EntityType::Budget,
            id.to_string(),
            Some(ctx.owner().to_string()),
            &before,
            &budget,
        ))?;

        tracing::info!(owner = %ctx.owner(), budget = %id, period_changed, "budget updated");
        Ok(budget)
    }

    pub fn budget_status(&self, ctx: &RequestContext, id: BudgetId) -> SpendResult<BudgetStatus> {
        let budget = self.get_budget(ctx, id)?;
        Ok(BudgetStatus::evaluate(
            budget,
            self.clock.now(),
            self.warning_percent,
        ))
    }

    pub fn list_budget_statuses(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
    ) -> SpendResult<Vec<BudgetStatus>> {
        let now = self.clock.now();
        Ok(self
            .store
            .list_budgets(ctx, filter)?
            .into_iter()
            .map(|b| BudgetStatus::evaluate(b, now, self.warning_percent))
            .collect())
    }

    /// Sum of the budget's matching expenses, read fresh from storage
    pub fn expected_spent(&self, ctx: &RequestContext, budget: &Budget) -> SpendResult<Money> {
        let expenses = self.store.list_expenses_in_window(
            ctx,
            CategoryFilter::Only(budget.category_id),
            budget.window(),
        )?;
        Money::checked_sum(expenses.iter().map(|e| e.amount)).ok_or_else(|| {
            SpendError::Inconsistency(format!(
                "expenses of budget {} sum past the largest representable amount",
                budget.id.short()
            ))
        })
    }

    /// Fail with `Inconsistency` if the stored spent total has drifted
    pub fn verify_budget(&self, ctx: &RequestContext, id: BudgetId) -> SpendResult<Budget> {
        let budget = self.get_budget(ctx, id)?;
        let expected = self.expected_spent(ctx, &budget)?;

        if budget.spent != expected {
            return Err(SpendError::Inconsistency(format!(
                "budget {} records {} spent but its expenses sum to {}",
                budget.id.short(),
                budget.spent,
                expected
            )));
        }
        Ok(budget)
    }

    /// Recompute `spent` from the expenses and store the result
    pub fn reconcile_budget(
        &self,
        ctx: &RequestContext,
        id: BudgetId,
    ) -> SpendResult<Reconciliation> {
        let _gate = self.store.lock_writes(ctx)?;
        let budget = self.get_budget(ctx, id)?;
        self.recompute(ctx, budget)
    }

    /// Caller holds the write gate
    fn recompute(&self, ctx: &RequestContext, mut budget: Budget) -> SpendResult<Reconciliation> {
        let before = budget.spent;
        let after = self.expected_spent(ctx, &budget)?;

        if before != after {
            budget.set_spent(after, self.clock.now());
            self.store
                .update_budget(ctx, budget.clone())?
                .ok_or_else(|| SpendError::budget_not_found(budget.id.to_string()))?;

            self.store.record(AuditEntry::update(
                EntityType::Budget,
                budget.id.to_string(),
                Some(ctx.owner().to_string()),
                &json!({ "spent": before.cents() }),
                &json!({ "spent": after.cents() }),
            ))?;

            tracing::info!(
                owner = %ctx.owner(),
                budget = %budget.id,
                before = before.cents(),
                after = after.cents(),
                "spent recomputed"
            );
        }

        Ok(Reconciliation {
            budget,
            before,
            after,
            drift: before - after,
        })
    }
}
