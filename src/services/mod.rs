//! Service layer for SpendGuard
//!
//! Business logic on top of the [`Store`](crate::storage::Store) traits:
//! validation, the budget spent invariant, analytics and cascading deletes.
//! Every service borrows its store, so any `Store` implementation can be
//! injected.

pub mod analytics;
pub mod category;
pub mod ledger;
pub mod period;
pub mod tracker;

pub use analytics::{
    AnalyticsEngine, CategoryAnalytics, ExpenseAnalytics, ExpenseSummary, ExpenseTrend,
    TrendDirection,
};
pub use category::{CategoryRemoval, CategoryService, CategoryStats};
pub use ledger::{ExpenseLedger, NewExpense};
pub use period::PeriodResolver;
pub use tracker::{BudgetTracker, BudgetUpdate, NewBudget, Reconciliation};
