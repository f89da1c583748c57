//! Category repository for JSON storage
//!
//! Manages loading and saving categories to categories.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::SpendError;
use crate::models::{Category, CategoryId, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::{read_lock_error, write_lock_error};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct CategoryData {
    categories: Vec<Category>,
}

/// Repository for category persistence
pub struct CategoryRepository {
    path: PathBuf,
    categories: RwLock<HashMap<CategoryId, Category>>,
}

impl CategoryRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            categories: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), SpendError> {
        let file_data: CategoryData = read_json(&self.path)?;

        let mut categories = self.categories.write().map_err(write_lock_error)?;
        categories.clear();
        for category in file_data.categories {
            categories.insert(category.id, category);
        }

        Ok(())
    }

    fn persist(&self, categories: &HashMap<CategoryId, Category>) -> Result<(), SpendError> {
        let mut list: Vec<_> = categories.values().cloned().collect();
        list.sort_by(|a, b| {
            a.owner_id
                .cmp(&b.owner_id)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        write_json_atomic(&self.path, &CategoryData { categories: list })
    }

    pub fn insert(&self, category: Category) -> Result<(), SpendError> {
        let mut categories = self.categories.write().map_err(write_lock_error)?;
        let id = category.id;
        categories.insert(id, category);

        if let Err(e) = self.persist(&categories) {
            categories.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, id: CategoryId) -> Result<Option<Category>, SpendError> {
        let categories = self.categories.read().map_err(read_lock_error)?;
        Ok(categories.get(&id).cloned())
    }

    /// Case-insensitive name lookup within one owner's categories
    pub fn get_by_name(&self, owner: &UserId, name: &str) -> Result<Option<Category>, SpendError> {
        let categories = self.categories.read().map_err(read_lock_error)?;
        let needle = name.trim().to_lowercase();
        Ok(categories
            .values()
            .find(|c| &c.owner_id == owner && c.name.to_lowercase() == needle)
            .cloned())
    }

    /// Categories of `owner`, sorted by name
    pub fn for_owner(&self, owner: &UserId) -> Result<Vec<Category>, SpendError> {
        let categories = self.categories.read().map_err(read_lock_error)?;
        let mut list: Vec<_> = categories
            .values()
            .filter(|c| &c.owner_id == owner)
            .cloned()
            .collect();
        list.sort_by_key(|c| c.name.to_lowercase());
        Ok(list)
    }

    pub fn delete(&self, id: CategoryId) -> Result<Option<Category>, SpendError> {
        let mut categories = self.categories.write().map_err(write_lock_error)?;
        let Some(removed) = categories.remove(&id) else {
            return Ok(None);
        };

        if let Err(e) = self.persist(&categories) {
            categories.insert(removed.id, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }
}
