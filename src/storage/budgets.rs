//! Budget repository for JSON storage
//!
//! Manages loading and saving budgets to budgets.json. Spent adjustments are
//! applied as a single read-modify-write under the repository's write lock so
//! concurrent deltas against the same budget can never lose an update.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::SpendError;
use crate::models::{Budget, BudgetId, CategoryId, Money, SpentAdjustment, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::{read_lock_error, write_lock_error};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct BudgetData {
    #[serde(default)]
    budgets: Vec<Budget>,
}

/// Repository for budget persistence
pub struct BudgetRepository {
    path: PathBuf,
    budgets: RwLock<HashMap<BudgetId, Budget>>,
}

impl BudgetRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            budgets: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), SpendError> {
        let file_data: BudgetData = read_json(&self.path)?;

        let mut budgets = self.budgets.write().map_err(write_lock_error)?;
        budgets.clear();
        for budget in file_data.budgets {
            budgets.insert(budget.id, budget);
        }

        Ok(())
    }

    fn persist(&self, budgets: &HashMap<BudgetId, Budget>) -> Result<(), SpendError> {
        let mut list: Vec<_> = budgets.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        write_json_atomic(&self.path, &BudgetData { budgets: list })
    }

    pub fn insert(&self, budget: Budget) -> Result<(), SpendError> {
        let mut budgets = self.budgets.write().map_err(write_lock_error)?;
        let id = budget.id;
        budgets.insert(id, budget);

        if let Err(e) = self.persist(&budgets) {
            budgets.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, id: BudgetId) -> Result<Option<Budget>, SpendError> {
        let budgets = self.budgets.read().map_err(read_lock_error)?;
        Ok(budgets.get(&id).cloned())
    }

    /// Budgets of `owner`, oldest first, optionally restricted to one category
    pub fn for_owner(
        &self,
        owner: &UserId,
        category: Option<CategoryId>,
    ) -> Result<Vec<Budget>, SpendError> {
        let budgets = self.budgets.read().map_err(read_lock_error)?;

        let mut list: Vec<Budget> = budgets
            .values()
            .filter(|b| &b.owner_id == owner)
            .filter(|b| category.map_or(true, |c| b.category_id == c))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    /// Add `delta` to every budget of `owner` in `category_id` whose window
    /// contains `date`, flooring each result at zero.
    ///
    /// Either every matching budget is adjusted and persisted or none is. A
    /// spent total that would overflow is an `Inconsistency`.
    pub fn apply_delta(
        &self,
        owner: &UserId,
        category_id: CategoryId,
        date: DateTime<Utc>,
        delta: Money,
        at: DateTime<Utc>,
    ) -> Result<Vec<SpentAdjustment>, SpendError> {
        let mut budgets = self.budgets.write().map_err(write_lock_error)?;

        let mut ids: Vec<BudgetId> = budgets
            .values()
            .filter(|b| &b.owner_id == owner && b.category_id == category_id && b.contains(date))
            .map(|b| b.id)
            .collect();
        ids.sort();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let originals: Vec<Budget> = ids.iter().filter_map(|id| budgets.get(id).cloned()).collect();
        let mut adjustments = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(budget) = budgets.get_mut(id) else {
                continue;
            };
            match budget.apply_delta(delta, at) {
                Ok(adjustment) => adjustments.push(adjustment),
                Err(e) => {
                    restore(&mut budgets, &originals);
                    return Err(SpendError::Inconsistency(format!("budget {}: {}", id, e)));
                }
            }
        }

        if let Err(e) = self.persist(&budgets) {
            restore(&mut budgets, &originals);
            return Err(e);
        }

        Ok(adjustments)
    }

    /// Store `budget` in place of the record with the same id, returning the
    /// previous version
    pub fn replace(&self, budget: Budget) -> Result<Option<Budget>, SpendError> {
        let mut budgets = self.budgets.write().map_err(write_lock_error)?;
        let Some(previous) = budgets.get(&budget.id).cloned() else {
            return Ok(None);
        };
        budgets.insert(budget.id, budget);

        if let Err(e) = self.persist(&budgets) {
            budgets.insert(previous.id, previous);
            return Err(e);
        }
        Ok(Some(previous))
    }

    pub fn delete(&self, id: BudgetId) -> Result<Option<Budget>, SpendError> {
        let mut budgets = self.budgets.write().map_err(write_lock_error)?;
        let Some(removed) = budgets.remove(&id) else {
            return Ok(None);
        };

        if let Err(e) = self.persist(&budgets) {
            budgets.insert(removed.id, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    pub fn delete_in_category(
        &self,
        owner: &UserId,
        category_id: CategoryId,
    ) -> Result<Vec<Budget>, SpendError> {
        let mut budgets = self.budgets.write().map_err(write_lock_error)?;

        let ids: Vec<BudgetId> = budgets
            .values()
            .filter(|b| &b.owner_id == owner && b.category_id == category_id)
            .map(|b| b.id)
            .collect();
        let removed: Vec<Budget> = ids.iter().filter_map(|id| budgets.remove(id)).collect();
        if removed.is_empty() {
            return Ok(removed);
        }

        if let Err(e) = self.persist(&budgets) {
            for budget in removed {
                budgets.insert(budget.id, budget);
            }
            return Err(e);
        }
        Ok(removed)
    }
}

fn restore(budgets: &mut HashMap<BudgetId, Budget>, originals: &[Budget]) {
    for original in originals {
        budgets.insert(original.id, original.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Period;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn create_test_repo() -> (TempDir, BudgetRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = BudgetRepository::new(temp_dir.path().join("budgets.json"));
        (temp_dir, repo)
    }

    #[test]
    fn test_apply_delta_hits_only_active_windows() {
        let (_temp, repo) = create_test_repo();
        let food = CategoryId::new();

        let weekly = Budget::new(alice(), food, Money::from_units(100), Period::Weekly, start());
        let monthly = Budget::new(alice(), food, Money::from_units(400), Period::Monthly, start());
        repo.insert(weekly.clone()).unwrap();
        repo.insert(monthly.clone()).unwrap();

        // Day 10 is past the weekly window but inside the monthly one
        let adjustments = repo
            .apply_delta(&alice(), food, start() + Duration::days(10), Money::from_units(25), start())
            .unwrap();

        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].budget_id, monthly.id);
        assert_eq!(repo.get(weekly.id).unwrap().unwrap().spent, Money::zero());
        assert_eq!(repo.get(monthly.id).unwrap().unwrap().spent, Money::from_units(25));
    }

    #[test]
    fn test_apply_delta_ignores_other_owner() {
        let (_temp, repo) = create_test_repo();
        let food = CategoryId::new();
        let budget = Budget::new(alice(), food, Money::from_units(100), Period::Weekly, start());
        repo.insert(budget.clone()).unwrap();

        let bob = UserId::new("bob").unwrap();
        let adjustments = repo
            .apply_delta(&bob, food, start(), Money::from_units(5), start())
            .unwrap();
        assert!(adjustments.is_empty());
    }

    #[test]
    fn test_reload_preserves_spent_and_clamps() {
        let (temp_dir, repo) = create_test_repo();
        let food = CategoryId::new();
        let budget = Budget::new(alice(), food, Money::from_units(100), Period::Weekly, start());
        repo.insert(budget.clone()).unwrap();
        repo.apply_delta(&alice(), food, start(), Money::from_units(-5), start())
            .unwrap();

        let reopened = BudgetRepository::new(temp_dir.path().join("budgets.json"));
        reopened.load().unwrap();
        let loaded = reopened.get(budget.id).unwrap().unwrap();
        assert_eq!(loaded.spent, Money::zero());
        assert_eq!(loaded.clamp_count, 1);
    }

    #[test]
    fn test_apply_delta_stamps_given_time() {
        let (_temp, repo) = create_test_repo();
        let food = CategoryId::new();
        let budget = Budget::new(alice(), food, Money::from_units(100), Period::Monthly, start());
        repo.insert(budget.clone()).unwrap();

        let at = start() + Duration::hours(3);
        repo.apply_delta(&alice(), food, start(), Money::from_units(5), at)
            .unwrap();
        assert_eq!(repo.get(budget.id).unwrap().unwrap().updated_at, at);
    }

    #[test]
    fn test_apply_delta_overflow_leaves_every_budget_untouched() {
        let (temp_dir, repo) = create_test_repo();
        let food = CategoryId::new();
        let weekly = Budget::new(alice(), food, Money::from_units(100), Period::Weekly, start());
        let mut monthly = Budget::new(alice(), food, Money::from_units(400), Period::Monthly, start());
        monthly.spent = Money::from_cents(i64::MAX - 10);
        repo.insert(weekly.clone()).unwrap();
        repo.insert(monthly.clone()).unwrap();

        let err = repo
            .apply_delta(&alice(), food, start(), Money::from_cents(11), start())
            .unwrap_err();
        assert!(matches!(err, SpendError::Inconsistency(_)));

        assert_eq!(repo.get(weekly.id).unwrap().unwrap().spent, Money::zero());
        assert_eq!(repo.get(monthly.id).unwrap().unwrap().spent, monthly.spent);

        let reopened = BudgetRepository::new(temp_dir.path().join("budgets.json"));
        reopened.load().unwrap();
        assert_eq!(reopened.get(weekly.id).unwrap().unwrap().spent, Money::zero());
    }

    #[test]
    fn test_replace_missing_returns_none() {
        let (_temp, repo) = create_test_repo();
        let budget = Budget::new(alice(), CategoryId::new(), Money::from_units(1), Period::Weekly, start());
        assert!(repo.replace(budget).unwrap().is_none());
    }
}
