//! Storage layer for SpendGuard
//!
//! Services talk to persistence only through the [`ExpenseStore`],
//! [`BudgetStore`] and [`CategoryStore`] traits, bundled as [`Store`].
//! [`Storage`] is the JSON-file implementation: one file per entity kind,
//! atomic writes, `RwLock`-guarded in-memory indexes.
//!
//! Several processes may share one data directory. Compound mutations run
//! under [`Store::lock_writes`], which holds an exclusive OS lock on the
//! directory's lock file and reloads every file before handing back the
//! guard, so each mutation starts from what is on disk.
//!
//! Every call takes the caller's [`RequestContext`]: it fails with `Timeout`
//! once the deadline has passed and only ever sees records owned by
//! `ctx.owner()`. A record owned by someone else is reported as absent.

pub mod budgets;
pub mod categories;
pub mod expenses;
pub mod file_io;

pub use budgets::BudgetRepository;
pub use categories::CategoryRepository;
pub use expenses::ExpenseRepository;
pub use file_io::{read_json, write_json_atomic};

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;

use crate::audit::{AuditEntry, AuditLogger};
use crate::config::paths::SpendPaths;
use crate::context::RequestContext;
use crate::error::{SpendError, SpendResult};
use crate::models::{
    Budget, BudgetId, BudgetWindow, Category, CategoryFilter, CategoryId, Expense, ExpenseId,
    Money, SpentAdjustment,
};

/// Persistence of expenses
pub trait ExpenseStore: Send + Sync {
    fn insert_expense(&self, ctx: &RequestContext, expense: Expense) -> SpendResult<Expense>;

    fn get_expense(&self, ctx: &RequestContext, id: ExpenseId) -> SpendResult<Option<Expense>>;

    /// Newest first
    fn list_expenses(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
    ) -> SpendResult<Vec<Expense>>;

    /// Expenses dated inside `window`, oldest first. Equal dates keep a
    /// stable order (creation time, then id).
    fn list_expenses_in_window(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
        window: BudgetWindow,
    ) -> SpendResult<Vec<Expense>>;

    fn delete_expense(&self, ctx: &RequestContext, id: ExpenseId)
        -> SpendResult<Option<Expense>>;

    fn delete_expenses_in_category(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
    ) -> SpendResult<Vec<Expense>>;
}

/// Persistence of budgets
pub trait BudgetStore: Send + Sync {
    fn insert_budget(&self, ctx: &RequestContext, budget: Budget) -> SpendResult<Budget>;

    fn get_budget(&self, ctx: &RequestContext, id: BudgetId) -> SpendResult<Option<Budget>>;

    /// Oldest first
    fn list_budgets(&self, ctx: &RequestContext, filter: CategoryFilter)
        -> SpendResult<Vec<Budget>>;

    /// Atomically add `delta` to the spent amount of every active budget in
    /// `category_id` for `date`, flooring at zero and stamping each with
    /// `at`. Results are ordered by budget id.
    fn apply_spent_delta(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
        date: DateTime<Utc>,
        delta: Money,
        at: DateTime<Utc>,
    ) -> SpendResult<Vec<SpentAdjustment>>;

    /// Overwrite an existing budget; returns the previous version, or `None`
    /// when there is no such budget for this owner
    fn update_budget(&self, ctx: &RequestContext, budget: Budget) -> SpendResult<Option<Budget>>;

    fn delete_budget(&self, ctx: &RequestContext, id: BudgetId) -> SpendResult<Option<Budget>>;

    fn delete_budgets_in_category(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
    ) -> SpendResult<Vec<Budget>>;
}

/// Persistence of categories
pub trait CategoryStore: Send + Sync {
    fn insert_category(&self, ctx: &RequestContext, category: Category) -> SpendResult<Category>;

    fn get_category(&self, ctx: &RequestContext, id: CategoryId)
        -> SpendResult<Option<Category>>;

    /// Case-insensitive
    fn find_category_by_name(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> SpendResult<Option<Category>>;

    fn list_categories(&self, ctx: &RequestContext) -> SpendResult<Vec<Category>>;

    fn delete_category(&self, ctx: &RequestContext, id: CategoryId)
        -> SpendResult<Option<Category>>;
}

/// Everything the services need from persistence
pub trait Store: ExpenseStore + BudgetStore + CategoryStore {
    /// Take the store-wide write gate. Compound mutations (an expense write
    /// and its budget adjustment, a budget insert and its recomputation)
    /// hold it for their whole duration, and read through it: the gate
    /// excludes other processes too and refreshes the store from disk once
    /// taken. Gives up with `Timeout` at the context deadline.
    fn lock_writes(&self, ctx: &RequestContext) -> SpendResult<WriteGuard<'_>>;

    /// Append an entry to the audit trail
    fn record(&self, entry: AuditEntry) -> SpendResult<()>;
}

/// Held while a compound mutation runs; releases both locks on drop
pub struct WriteGuard<'a> {
    lock_file: File,
    _gate: MutexGuard<'a, ()>,
}

impl<'a> WriteGuard<'a> {
    /// Take the in-process `gate`, then an exclusive lock on `lock_path`.
    /// Spins on each until it is free or the context deadline passes.
    pub fn acquire(
        gate: &'a Mutex<()>,
        lock_path: &Path,
        ctx: &RequestContext,
    ) -> SpendResult<Self> {
        let gate = lock_gate(gate, ctx)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| {
                SpendError::Storage(format!(
                    "lock_writes: failed to open {}: {}",
                    lock_path.display(),
                    e
                ))
            })?;

        loop {
            match FileExt::try_lock_exclusive(&lock_file) {
                Ok(true) => {
                    return Ok(Self {
                        lock_file,
                        _gate: gate,
                    })
                }
                Ok(false) => {
                    if ctx.is_expired() {
                        tracing::warn!(
                            owner = %ctx.owner(),
                            lock_file = %lock_path.display(),
                            "timed out waiting for data directory lock"
                        );
                        return Err(ctx.timeout_error("lock_writes"));
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) => {
                    return Err(SpendError::Storage(format!(
                        "lock_writes: failed to lock {}: {}",
                        lock_path.display(),
                        e
                    )))
                }
            }
        }
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        // Closing the file releases the lock as well
        if let Err(e) = FileExt::unlock(&self.lock_file) {
            tracing::warn!(error = %e, "failed to release data directory lock");
        }
    }
}

fn lock_gate<'a>(gate: &'a Mutex<()>, ctx: &RequestContext) -> SpendResult<MutexGuard<'a, ()>> {
    loop {
        match gate.try_lock() {
            Ok(guard) => return Ok(guard),
            // The gate protects no data, so a panic elsewhere leaves nothing to repair
            Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                if ctx.is_expired() {
                    tracing::warn!(owner = %ctx.owner(), "timed out waiting for write gate");
                    return Err(ctx.timeout_error("lock_writes"));
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }
}

pub(crate) fn read_lock_error<E: std::fmt::Display>(e: E) -> SpendError {
    SpendError::Storage(format!("Failed to acquire read lock: {}", e))
}

pub(crate) fn write_lock_error<E: std::fmt::Display>(e: E) -> SpendError {
    SpendError::Storage(format!("Failed to acquire write lock: {}", e))
}

/// Prefix storage failures with the operation that hit them
fn in_operation(operation: &'static str) -> impl Fn(SpendError) -> SpendError {
    move |e| match e {
        SpendError::Storage(msg) => SpendError::Storage(format!("{}: {}", operation, msg)),
        other => other,
    }
}

/// JSON-file storage coordinator
pub struct Storage {
    paths: SpendPaths,
    expenses: ExpenseRepository,
    budgets: BudgetRepository,
    categories: CategoryRepository,
    audit: AuditLogger,
    write_gate: Mutex<()>,
}

impl Storage {
    /// Open the data directory, creating it if needed, and load every file
    pub fn open(paths: SpendPaths) -> SpendResult<Self> {
        paths.ensure_directories()?;

        let storage = Self {
            expenses: ExpenseRepository::new(paths.expenses_file()),
            budgets: BudgetRepository::new(paths.budgets_file()),
            categories: CategoryRepository::new(paths.categories_file()),
            audit: AuditLogger::new(paths.audit_log()),
            write_gate: Mutex::new(()),
            paths,
        };

        storage.reload()?;

        tracing::debug!(base_dir = %storage.paths.base_dir().display(), "storage opened");
        Ok(storage)
    }

    /// [`Storage::open`] under a request deadline: fails with `Timeout` if
    /// the context expires before or while the files load
    pub fn open_within(paths: SpendPaths, ctx: &RequestContext) -> SpendResult<Self> {
        ctx.ensure_live("open_storage")?;
        let storage = Self::open(paths)?;
        ctx.ensure_live("open_storage")?;
        Ok(storage)
    }

    /// Replace the in-memory state with the current file contents
    pub fn reload(&self) -> SpendResult<()> {
        self.expenses.load()?;
        self.budgets.load()?;
        self.categories.load()?;
        Ok(())
    }

    pub fn paths(&self) -> &SpendPaths {
        &self.paths
    }

    pub fn audit_log(&self) -> &AuditLogger {
        &self.audit
    }
}

impl ExpenseStore for Storage {
    fn insert_expense(&self, ctx: &RequestContext, expense: Expense) -> SpendResult<Expense> {
        ctx.ensure_live("insert_expense")?;
        if &expense.owner_id != ctx.owner() {
            return Err(SpendError::Storage(
                "insert_expense: expense owner does not match request owner".into(),
            ));
        }
        self.expenses
            .insert(expense.clone())
            .map_err(in_operation("insert_expense"))?;
        Ok(expense)
    }

    fn get_expense(&self, ctx: &RequestContext, id: ExpenseId) -> SpendResult<Option<Expense>> {
        ctx.ensure_live("get_expense")?;
        let expense = self.expenses.get(id).map_err(in_operation("get_expense"))?;
        Ok(expense.filter(|e| &e.owner_id == ctx.owner()))
    }

    fn list_expenses(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
    ) -> SpendResult<Vec<Expense>> {
        ctx.ensure_live("list_expenses")?;
        let mut expenses = self
            .expenses
            .for_owner(ctx.owner(), category_of(filter))
            .map_err(in_operation("list_expenses"))?;
        expenses.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(expenses)
    }

    fn list_expenses_in_window(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
        window: BudgetWindow,
    ) -> SpendResult<Vec<Expense>> {
        ctx.ensure_live("list_expenses_in_window")?;
        let mut expenses: Vec<Expense> = self
            .expenses
            .for_owner(ctx.owner(), category_of(filter))
            .map_err(in_operation("list_expenses_in_window"))?
            .into_iter()
            .filter(|e| window.contains(e.date))
            .collect();
        expenses.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(expenses)
    }

    fn delete_expense(
        &self,
        ctx: &RequestContext,
        id: ExpenseId,
    ) -> SpendResult<Option<Expense>> {
        ctx.ensure_live("delete_expense")?;
        if self.get_expense(ctx, id)?.is_none() {
            return Ok(None);
        }
        self.expenses.delete(id).map_err(in_operation("delete_expense"))
    }

    fn delete_expenses_in_category(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
    ) -> SpendResult<Vec<Expense>> {
        ctx.ensure_live("delete_expenses_in_category")?;
        self.expenses
            .delete_in_category(ctx.owner(), category_id)
            .map_err(in_operation("delete_expenses_in_category"))
    }
}

impl BudgetStore for Storage {
    fn insert_budget(&self, ctx: &RequestContext, budget: Budget) -> SpendResult<Budget> {
        ctx.ensure_live("insert_budget")?;
        if &budget.owner_id != ctx.owner() {
            return Err(SpendError::Storage(
                "insert_budget: budget owner does not match request owner".into(),
            ));
        }
        self.budgets
            .insert(budget.clone())
            .map_err(in_operation("insert_budget"))?;
        Ok(budget)
    }

    fn get_budget(&self, ctx: &RequestContext, id: BudgetId) -> SpendResult<Option<Budget>> {
        ctx.ensure_live("get_budget")?;
        let budget = self.budgets.get(id).map_err(in_operation("get_budget"))?;
        Ok(budget.filter(|b| &b.owner_id == ctx.owner()))
    }

    fn list_budgets(
        &self,
        ctx: &RequestContext,
        filter: CategoryFilter,
    ) -> SpendResult<Vec<Budget>> {
        ctx.ensure_live("list_budgets")?;
        self.budgets
            .for_owner(ctx.owner(), category_of(filter))
            .map_err(in_operation("list_budgets"))
    }

    fn apply_spent_delta(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
        date: DateTime<Utc>,
        delta: Money,
        at: DateTime<Utc>,
    ) -> SpendResult<Vec<SpentAdjustment>> {
        ctx.ensure_live("apply_spent_delta")?;
        self.budgets
            .apply_delta(ctx.owner(), category_id, date, delta, at)
            .map_err(in_operation("apply_spent_delta"))
    }

    fn update_budget(&self, ctx: &RequestContext, budget: Budget) -> SpendResult<Option<Budget>> {
        ctx.ensure_live("update_budget")?;
        if &budget.owner_id != ctx.owner() || self.get_budget(ctx, budget.id)?.is_none() {
            return Ok(None);
        }
        self.budgets
            .replace(budget)
            .map_err(in_operation("update_budget"))
    }

    fn delete_budget(&self, ctx: &RequestContext, id: BudgetId) -> SpendResult<Option<Budget>> {
        ctx.ensure_live("delete_budget")?;
        if self.get_budget(ctx, id)?.is_none() {
            return Ok(None);
        }
        self.budgets.delete(id).map_err(in_operation("delete_budget"))
    }

    fn delete_budgets_in_category(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
    ) -> SpendResult<Vec<Budget>> {
        ctx.ensure_live("delete_budgets_in_category")?;
        self.budgets
            .delete_in_category(ctx.owner(), category_id)
            .map_err(in_operation("delete_budgets_in_category"))
    }
}

impl CategoryStore for Storage {
    fn insert_category(&self, ctx: &RequestContext, category: Category) -> SpendResult<Category> {
        ctx.ensure_live("insert_category")?;
        if &category.owner_id != ctx.owner() {
            return Err(SpendError::Storage(
                "insert_category: category owner does not match request owner".into(),
            ));
        }
        self.categories
            .insert(category.clone())
            .map_err(in_operation("insert_category"))?;
        Ok(category)
    }

    fn get_category(
        &self,
        ctx: &RequestContext,
        id: CategoryId,
    ) -> SpendResult<Option<Category>> {
        ctx.ensure_live("get_category")?;
        let category = self.categories.get(id).map_err(in_operation("get_category"))?;
        Ok(category.filter(|c| &c.owner_id == ctx.owner()))
    }

    fn find_category_by_name(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> SpendResult<Option<Category>> {
        ctx.ensure_live("find_category_by_name")?;
        self.categories
            .get_by_name(ctx.owner(), name)
            .map_err(in_operation("find_category_by_name"))
    }

    fn list_categories(&self, ctx: &RequestContext) -> SpendResult<Vec<Category>> {
        ctx.ensure_live("list_categories")?;
        self.categories
            .for_owner(ctx.owner())
            .map_err(in_operation("list_categories"))
    }

    fn delete_category(
        &self,
        ctx: &RequestContext,
        id: CategoryId,
    ) -> SpendResult<Option<Category>> {
        ctx.ensure_live("delete_category")?;
        if self.get_category(ctx, id)?.is_none() {
            return Ok(None);
        }
        self.categories
            .delete(id)
            .map_err(in_operation("delete_category"))
    }
}

impl Store for Storage {
    fn lock_writes(&self, ctx: &RequestContext) -> SpendResult<WriteGuard<'_>> {
        let guard = WriteGuard::acquire(&self.write_gate, &self.paths.lock_file(), ctx)?;
        self.reload().map_err(in_operation("lock_writes"))?;
        Ok(guard)
    }

    fn record(&self, entry: AuditEntry) -> SpendResult<()> {
        self.audit.log(&entry)
    }
}

fn category_of(filter: CategoryFilter) -> Option<CategoryId> {
    match filter {
        CategoryFilter::All => None,
        CategoryFilter::Only(id) => Some(id),
    }
}
