//! Category service
//!
//! Category CRUD plus usage statistics. Deleting a category cascades to its
//! budgets and expenses.

use serde::Serialize;

use crate::audit::{AuditEntry, EntityType};
use crate::context::RequestContext;
use crate::error::{SpendError, SpendResult};
use crate::models::{Category, CategoryFilter, CategoryId, Money};
use crate::storage::Store;

/// A category with its lifetime usage
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStats {
    pub category: Category,
    pub expense_count: usize,
    pub total_amount: Money,
}

/// What a cascading delete removed
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRemoval {
    pub category: Category,
    pub budgets_removed: usize,
    pub expenses_removed: usize,
}

/// Service for category management
pub struct CategoryService<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> CategoryService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn create_category(&self, ctx: &RequestContext, name: &str) -> SpendResult<Category> {
        let category = Category::new(ctx.owner().clone(), name);
        category
            .validate()
            .map_err(|e| SpendError::Validation(e.to_string()))?;

        let _gate = self.store.lock_writes(ctx)?;

        if self.store.find_category_by_name(ctx, &category.name)?.is_some() {
            return Err(SpendError::Duplicate {
                entity_type: "Category",
                identifier: category.name,
            });
        }

        let category = self.store.insert_category(ctx, category)?;
        self.store.record(AuditEntry::create(
            EntityType::Category,
            category.id.to_string(),
            Some(ctx.owner().to_string()),
            &category,
        ))?;

        tracing::info!(owner = %ctx.owner(), category = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub fn get_category(&self, ctx: &RequestContext, id: CategoryId) -> SpendResult<Category> {
        self.store
            .get_category(ctx, id)?
            .ok_or_else(|| SpendError::category_not_found(id.to_string()))
    }

    /// Look up by name first, then by id
    pub fn find_category(&self, ctx: &RequestContext, identifier: &str) -> SpendResult<Category> {
        if let Some(category) = self.store.find_category_by_name(ctx, identifier)? {
            return Ok(category);
        }

        if let Ok(id) = identifier.parse::<CategoryId>() {
            if let Some(category) = self.store.get_category(ctx, id)? {
                return Ok(category);
            }
        }

        Err(SpendError::category_not_found(identifier))
    }

    /// Categories sorted by name, with expense count and total
    pub fn list_categories(&self, ctx: &RequestContext) -> SpendResult<Vec<CategoryStats>> {
        let categories = self.store.list_categories(ctx)?;
        let expenses = self.store.list_expenses(ctx, CategoryFilter::All)?;

        categories
            .into_iter()
            .map(|category| -> SpendResult<CategoryStats> {
                let amounts: Vec<Money> = expenses
                    .iter()
                    .filter(|e| e.category_id == category.id)
                    .map(|e| e.amount)
                    .collect();
                let total_amount = Money::checked_sum(amounts.iter().copied()).ok_or_else(|| {
                    SpendError::Inconsistency(format!(
                        "expenses of category {} sum past the largest representable amount",
                        category.name
                    ))
                })?;
                Ok(CategoryStats {
                    expense_count: amounts.len(),
                    total_amount,
                    category,
                })
            })
            .collect()
    }

    /// Categories with the most expenses first; ties keep name order
    pub fn most_used_categories(
        &self,
        ctx: &RequestContext,
        limit: usize,
    ) -> SpendResult<Vec<CategoryStats>> {
        let mut stats = self.list_categories(ctx)?;
        stats.sort_by(|a, b| b.expense_count.cmp(&a.expense_count));
        stats.truncate(limit);
        Ok(stats)
    }

    /// Delete a category together with its budgets and expenses
    pub fn delete_category(
        &self,
        ctx: &RequestContext,
        id: CategoryId,
    ) -> SpendResult<CategoryRemoval> {
        let _gate = self.store.lock_writes(ctx)?;

        let category = self.get_category(ctx, id)?;

        let budgets = self.store.delete_budgets_in_category(ctx, id)?;
        let expenses = self.store.delete_expenses_in_category(ctx, id)?;
        self.store
            .delete_category(ctx, id)?
            .ok_or_else(|| SpendError::category_not_found(id.to_string()))?;

        let owner = Some(ctx.owner().to_string());
        for budget in &budgets {
            self.store.record(AuditEntry::delete(
                EntityType::Budget,
                budget.id.to_string(),
                owner.clone(),
                budget,
            ))?;
        }
        for expense in &expenses {
            self.store.record(AuditEntry::delete(
                EntityType::Expense,
                expense.id.to_string(),
                owner.clone(),
                expense,
            ))?;
        }
        self.store.record(AuditEntry::delete(
            EntityType::Category,
            id.to_string(),
            owner,
            &category,
        ))?;

        tracing::info!(
            owner = %ctx.owner(),
            category = %id,
            budgets = budgets.len(),
            expenses = expenses.len(),
            "category deleted"
        );

        Ok(CategoryRemoval {
            category,
            budgets_removed: budgets.len(),
            expenses_removed: expenses.len(),
        })
    }
}
