//! Expense repository for JSON storage
//!
//! Manages loading and saving expenses to expenses.json, with a per-category
//! index for budget recomputation and analytics scans.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::SpendError;
use crate::models::{CategoryId, Expense, ExpenseId, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::{read_lock_error, write_lock_error};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct ExpenseData {
    expenses: Vec<Expense>,
}

#[derive(Default)]
struct ExpenseIndex {
    data: HashMap<ExpenseId, Expense>,
    /// category_id -> expense ids
    by_category: HashMap<CategoryId, Vec<ExpenseId>>,
}

impl ExpenseIndex {
    fn insert(&mut self, expense: Expense) {
        self.by_category
            .entry(expense.category_id)
            .or_default()
            .push(expense.id);
        self.data.insert(expense.id, expense);
    }

    fn remove(&mut self, id: ExpenseId) -> Option<Expense> {
        let removed = self.data.remove(&id)?;
        if let Some(ids) = self.by_category.get_mut(&removed.category_id) {
            ids.retain(|&other| other != id);
        }
        Some(removed)
    }
}

/// Repository for expense persistence with a category index
pub struct ExpenseRepository {
    path: PathBuf,
    index: RwLock<ExpenseIndex>,
}

impl ExpenseRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            index: RwLock::new(ExpenseIndex::default()),
        }
    }

    /// Load expenses from disk and rebuild the index
    pub fn load(&self) -> Result<(), SpendError> {
        let file_data: ExpenseData = read_json(&self.path)?;

        let mut index = self.index.write().map_err(write_lock_error)?;
        *index = ExpenseIndex::default();
        for expense in file_data.expenses {
            index.insert(expense);
        }

        Ok(())
    }

    /// Caller must hold the index lock so concurrent saves never interleave
    fn persist(&self, index: &ExpenseIndex) -> Result<(), SpendError> {
        let mut expenses: Vec<_> = index.data.values().cloned().collect();
        expenses.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });

        write_json_atomic(&self.path, &ExpenseData { expenses })
    }

    pub fn insert(&self, expense: Expense) -> Result<(), SpendError> {
        let mut index = self.index.write().map_err(write_lock_error)?;
        let id = expense.id;
        index.insert(expense);

        if let Err(e) = self.persist(&index) {
            index.remove(id);
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, id: ExpenseId) -> Result<Option<Expense>, SpendError> {
        let index = self.index.read().map_err(read_lock_error)?;
        Ok(index.data.get(&id).cloned())
    }

    /// All expenses of `owner`, optionally restricted to one category
    pub fn for_owner(
        &self,
        owner: &UserId,
        category: Option<CategoryId>,
    ) -> Result<Vec<Expense>, SpendError> {
        let index = self.index.read().map_err(read_lock_error)?;

        let expenses = match category {
            Some(category_id) => index
                .by_category
                .get(&category_id)
                .map(|ids| ids.as_slice())
                .unwrap_or(&[])
                .iter()
                .filter_map(|id| index.data.get(id))
                .filter(|e| &e.owner_id == owner)
                .cloned()
                .collect(),
            None => index
                .data
                .values()
                .filter(|e| &e.owner_id == owner)
                .cloned()
                .collect(),
        };

        Ok(expenses)
    }

    pub fn delete(&self, id: ExpenseId) -> Result<Option<Expense>, SpendError> {
        let mut index = self.index.write().map_err(write_lock_error)?;
        let Some(removed) = index.remove(id) else {
            return Ok(None);
        };

        if let Err(e) = self.persist(&index) {
            index.insert(removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// Remove every expense `owner` filed under `category_id`
    pub fn delete_in_category(
        &self,
        owner: &UserId,
        category_id: CategoryId,
    ) -> Result<Vec<Expense>, SpendError> {
        let mut index = self.index.write().map_err(write_lock_error)?;

        let ids: Vec<ExpenseId> = index
            .by_category
            .get(&category_id)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
            .filter(|id| index.data.get(id).is_some_and(|e| &e.owner_id == owner))
            .collect();

        let removed: Vec<Expense> = ids.into_iter().filter_map(|id| index.remove(id)).collect();
        if removed.is_empty() {
            return Ok(removed);
        }

        if let Err(e) = self.persist(&index) {
            for expense in removed {
                index.insert(expense);
            }
            return Err(e);
        }
        Ok(removed)
    }

    pub fn count(&self) -> Result<usize, SpendError> {
        let index = self.index.read().map_err(read_lock_error)?;
        Ok(index.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use chrono::Utc;
    use tempfile::TempDir;

    fn owner(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    fn create_test_repo() -> (TempDir, ExpenseRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = ExpenseRepository::new(temp_dir.path().join("expenses.json"));
        (temp_dir, repo)
    }

    #[test]
    fn test_insert_and_reload() {
        let (temp_dir, repo) = create_test_repo();
        let expense = Expense::new(owner("alice"), CategoryId::new(), Money::from_units(20), Utc::now());
        repo.insert(expense.clone()).unwrap();

        let reopened = ExpenseRepository::new(temp_dir.path().join("expenses.json"));
        reopened.load().unwrap();
        assert_eq!(reopened.get(expense.id).unwrap(), Some(expense));
    }

    #[test]
    fn test_for_owner_filters_owner_and_category() {
        let (_temp, repo) = create_test_repo();
        let food = CategoryId::new();
        let rent = CategoryId::new();

        repo.insert(Expense::new(owner("alice"), food, Money::from_units(1), Utc::now())).unwrap();
        repo.insert(Expense::new(owner("alice"), rent, Money::from_units(2), Utc::now())).unwrap();
        repo.insert(Expense::new(owner("bob"), food, Money::from_units(3), Utc::now())).unwrap();

        assert_eq!(repo.for_owner(&owner("alice"), None).unwrap().len(), 2);
        let alice_food = repo.for_owner(&owner("alice"), Some(food)).unwrap();
        assert_eq!(alice_food.len(), 1);
        assert_eq!(alice_food[0].amount, Money::from_units(1));
    }

    #[test]
    fn test_delete_in_category_keeps_other_owners() {
        let (_temp, repo) = create_test_repo();
        let food = CategoryId::new();

        repo.insert(Expense::new(owner("alice"), food, Money::from_units(1), Utc::now())).unwrap();
        repo.insert(Expense::new(owner("bob"), food, Money::from_units(3), Utc::now())).unwrap();

        let removed = repo.delete_in_category(&owner("alice"), food).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(repo.for_owner(&owner("bob"), Some(food)).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_is_none() {
        let (_temp, repo) = create_test_repo();
        assert_eq!(repo.delete(ExpenseId::new()).unwrap(), None);
    }
}
