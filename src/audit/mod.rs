//! Audit logging for SpendGuard
//!
//! Every create, update and delete of an expense, budget or category is
//! appended to a line-delimited JSON log, together with the owner that made
//! the change. Spent adjustments on budgets are recorded as updates.
//!
//! # Example
//!
//! ```rust,ignore
//! use spendguard::audit::{AuditEntry, AuditLogger, EntityType};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! let entry = AuditEntry::create(
//!     EntityType::Expense,
//!     expense.id.to_string(),
//!     Some(expense.owner_id.to_string()),
//!     &expense,
//! );
//! logger.log(&entry)?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
