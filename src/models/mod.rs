//! Core data models for SpendGuard
//!
//! Expenses, categories and budgets, plus the value types they share:
//! identifiers, money and fixed-length periods.

pub mod budget;
pub mod category;
pub mod expense;
pub mod ids;
pub mod money;
pub mod period;

pub use budget::{Budget, BudgetHealth, BudgetStatus, SpentAdjustment};
pub use category::{Category, CategoryFilter};
pub use expense::Expense;
pub use ids::{BudgetId, CategoryId, ExpenseId, UserId};
pub use money::Money;
pub use period::{BudgetWindow, Period};
