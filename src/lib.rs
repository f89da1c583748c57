//! SpendGuard - expense tracking against per-category budgets
//!
//! The core keeps every budget's `spent` figure equal to the sum of the
//! expenses that fall into its window, and computes windowed analytics for a
//! category or a whole user.
//!
//! # Architecture
//!
//! - `config`: path resolution and user settings
//! - `context`: request owner, deadline and clock
//! - `error`: error types
//! - `models`: expenses, budgets, categories and their value types
//! - `storage`: store traits and the JSON-file implementation
//! - `services`: ledger, budget tracker, analytics, categories
//! - `audit`: append-only audit trail
//! - `cli` / `display`: command-line front end
//!
//! # Example
//!
//! ```rust,ignore
//! use spendguard::config::SpendPaths;
//! use spendguard::context::{RequestContext, SystemClock};
//! use spendguard::services::{ExpenseLedger, NewExpense};
//! use spendguard::storage::Storage;
//!
//! let storage = Storage::open(SpendPaths::new()?)?;
//! let ctx = RequestContext::with_default_timeout(owner);
//! let ledger = ExpenseLedger::new(&storage, &SystemClock);
//! ledger.create_expense(&ctx, NewExpense { category_id, amount, description: None, date: None })?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{SpendError, SpendResult};
