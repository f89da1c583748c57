//! Expense ledger
//!
//! Records and removes expenses, and tells the budget tracker about every
//! change so budget totals follow the ledger.

use chrono::{DateTime, Utc};

use crate::audit::{AuditEntry, EntityType};
use crate::context::{Clock, RequestContext};
use crate::error::{SpendError, SpendResult};
use crate::models::{BudgetWindow, CategoryFilter, CategoryId, Expense, ExpenseId, Money};
use crate::storage::Store;

use super::tracker::BudgetTracker;

/// Input for [`ExpenseLedger::create_expense`]
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub category_id: CategoryId,
    pub amount: Money,
    pub description: Option<String>,
    /// Effective date; defaults to now
    pub date: Option<DateTime<Utc>>,
}

/// Service for expense management
pub struct ExpenseLedger<'a, S: Store + ?Sized> {
    store: &'a S,
    clock: &'a dyn Clock,
    tracker: BudgetTracker<'a, S>,
}

impl<'a, S: Store + ?Sized> ExpenseLedger<'a, S> {
    pub fn new(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            clock,
            tracker: BudgetTracker::new(store, clock),
        }
    }

    /// Record an expense and add it to every matching budget.
    ///
    /// If the budget adjustment fails the expense stays recorded and the
    /// error is returned; `reconcile_budget` repairs the affected budgets.
    pub fn create_expense(&self, ctx: &RequestContext, new: NewExpense) -> SpendResult<Expense> {
        let date = new.date.unwrap_or_else(|| self.clock.now());
        let expense = Expense::new(ctx.owner().clone(), new.category_id, new.amount, date)
            .with_description(new.description);
        expense
            .validate()
            .map_err(|e| SpendError::Validation(e.to_string()))?;

        let _gate = self.store.lock_writes(ctx)?;

        if self.store.get_category(ctx, expense.category_id)?.is_none() {
            return Err(SpendError::category_not_found(expense.category_id.to_string()));
        }

        let expense = self.store.insert_expense(ctx, expense)?;
        self.store.record(AuditEntry::create(
            EntityType::Expense,
            expense.id.to_string(),
            Some(ctx.owner().to_string()),
            &expense,
        ))?;

        match self.tracker.on_expense_created(ctx, &expense) {
            Ok(adjustments) => {
                tracing::info!(
                    owner = %ctx.owner(),
                    expense = %expense.id,
                    category = %expense.category_id,
                    amount = expense.amount.cents(),
                    budgets = adjustments.len(),
                    "expense created"
                );
                Ok(expense)
            }
            Err(e) => {
                tracing::error!(
                    owner = %ctx.owner(),
                    expense = %expense.id,
                    error = %e,
                    "expense recorded but budget adjustment failed"
                );
                Err(e)
            }
        }
    }

    /// An expense the caller owns, filed under `category_id`
    pub fn get_expense(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
        id: ExpenseId,
    ) -> SpendResult<Expense> {
        self.store
            .get_expense(ctx, id)?
            .filter(|e| e.category_id == category_id)
            .ok_or_else(|| SpendError::expense_not_found(id.to_string()))
    }

    /// Newest first
    pub fn list_expenses(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
    ) -> SpendResult<Vec<Expense>> {
        self.store.list_expenses(ctx, filter)
    }

    /// Oldest first
    pub fn list_expenses_in_window(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
        window: BudgetWindow,
    ) -> SpendResult<Vec<Expense>> {
        self.store.list_expenses_in_window(ctx, filter, window)
    }

    /// Remove an expense and take it back out of its budgets
    pub fn delete_expense(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
        id: ExpenseId,
    ) -> SpendResult<Expense> {
        let _gate = self.store.lock_writes(ctx)?;

        let expense = self.get_expense(ctx, category_id, id)?;
        self.store
            .delete_expense(ctx, id)?
            .ok_or_else(|| SpendError::expense_not_found(id.to_string()))?;

        self.store.record(AuditEntry::delete(
            EntityType::Expense,
            id.to_string(),
            Some(ctx.owner().to_string()),
            &expense,
        ))?;

        match self.tracker.on_expense_deleted(ctx, &expense) {
            Ok(adjustments) => {
                tracing::info!(
                    owner = %ctx.owner(),
                    expense = %id,
                    budgets = adjustments.len(),
                    "expense deleted"
                );
                Ok(expense)
            }
            Err(e) => {
                tracing::error!(
                    owner = %ctx.owner(),
                    expense = %id,
                    error = %e,
                    "expense deleted but budget adjustment failed"
                );
                Err(e)
            }
        }
    }
}
