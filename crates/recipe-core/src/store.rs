//! Category-keyed recipe store.
//!
//! [`RecipeStore`] is a plain map and is not shared. The pipeline talks to it
//! through a [`StoreHandle`], which forwards every operation to the single
//! task that owns the store, so writes are serialized.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::StoreError;

/// An assembled recipe. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub category: String,
    /// Thumbnail of the source document
    #[serde(skip)]
    pub image: Arc<DynamicImage>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(
        category: impl Into<String>,
        image: Arc<DynamicImage>,
        ingredients: Vec<String>,
        instructions: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: category.into(),
            image,
            ingredients,
            instructions,
            created_at: Utc::now(),
        }
    }
}

/// Map of category name to recipes in insertion order.
///
/// A category whose last recipe is deleted is removed. Categories created
/// explicitly with [`RecipeStore::add_category`] may stay empty.
#[derive(Debug, Default)]
pub struct RecipeStore {
    categories: HashMap<String, Vec<Recipe>>,
}

impl RecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `recipe` to its category, creating the category if absent.
    pub fn add_recipe(&mut self, recipe: Recipe) -> Result<(), StoreError> {
        if recipe.category.trim().is_empty() {
            return Err(StoreError::EmptyCategoryName);
        }
        self.categories
            .entry(recipe.category.clone())
            .or_default()
            .push(recipe);
        Ok(())
    }

    /// Append every recipe, or none of them if any is rejected.
    pub fn add_recipes(&mut self, recipes: Vec<Recipe>) -> Result<(), StoreError> {
        if recipes.iter().any(|r| r.category.trim().is_empty()) {
            return Err(StoreError::EmptyCategoryName);
        }
        for recipe in recipes {
            self.add_recipe(recipe)?;
        }
        Ok(())
    }

    /// Create an empty category.
    pub fn add_category(&mut self, name: &str) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::EmptyCategoryName);
        }
        if self.categories.contains_key(name) {
            return Err(StoreError::CategoryExists(name.to_string()));
        }
        self.categories.insert(name.to_string(), Vec::new());
        Ok(())
    }

    /// Remove a category and all its recipes. Returns how many were removed.
    pub fn delete_category(&mut self, name: &str) -> Result<usize, StoreError> {
        self.categories
            .remove(name)
            .map(|recipes| recipes.len())
            .ok_or_else(|| StoreError::CategoryNotFound(name.to_string()))
    }

    /// Remove the recipe at `index`; drops the category if it becomes empty.
    pub fn delete_recipe(&mut self, category: &str, index: usize) -> Result<Recipe, StoreError> {
        let recipes = self
            .categories
            .get_mut(category)
            .ok_or_else(|| StoreError::CategoryNotFound(category.to_string()))?;

        if index >= recipes.len() {
            return Err(StoreError::RecipeNotFound {
                category: category.to_string(),
                index,
            });
        }

        let removed = recipes.remove(index);
        if recipes.is_empty() {
            self.categories.remove(category);
        }
        Ok(removed)
    }

    /// Category names, sorted.
    pub fn list_categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self.categories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn recipes(&self, category: &str) -> Result<&[Recipe], StoreError> {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::CategoryNotFound(category.to_string()))
    }

    pub fn recipe_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}

enum StoreCommand {
    AddRecipe {
        recipe: Recipe,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    AddRecipes {
        recipes: Vec<Recipe>,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    AddCategory {
        name: String,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    DeleteCategory {
        name: String,
        reply: oneshot::Sender<Result<usize, StoreError>>,
    },
    DeleteRecipe {
        category: String,
        index: usize,
        reply: oneshot::Sender<Result<Recipe, StoreError>>,
    },
    ListCategories {
        reply: oneshot::Sender<Vec<String>>,
    },
    Recipes {
        category: String,
        reply: oneshot::Sender<Result<Vec<Recipe>, StoreError>>,
    },
}

/// Cloneable handle to the task that owns a [`RecipeStore`].
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Spawn the owning task for `store`.
    ///
    /// The task stops once every handle has been dropped.
    pub fn spawn(mut store: RecipeStore) -> Self {
        let (tx, mut rx) = mpsc::channel::<StoreCommand>(32);

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    StoreCommand::AddRecipe { recipe, reply } => {
                        let category = recipe.category.clone();
                        let result = store.add_recipe(recipe);
                        if result.is_ok() {
                            tracing::info!(category = %category, "Saved recipe");
                        }
                        let _ = reply.send(result);
                    }
                    StoreCommand::AddRecipes { recipes, reply } => {
                        let count = recipes.len();
                        let result = store.add_recipes(recipes);
                        if result.is_ok() {
                            tracing::info!(recipes = count, "Saved recipes");
                        }
                        let _ = reply.send(result);
                    }
                    StoreCommand::AddCategory { name, reply } => {
                        let _ = reply.send(store.add_category(&name));
                    }
                    StoreCommand::DeleteCategory { name, reply } => {
                        let result = store.delete_category(&name);
                        if let Ok(count) = result {
                            tracing::info!(category = %name, recipes = count, "Deleted category");
                        }
                        let _ = reply.send(result);
                    }
                    StoreCommand::DeleteRecipe {
                        category,
                        index,
                        reply,
                    } => {
                        let _ = reply.send(store.delete_recipe(&category, index));
                    }
                    StoreCommand::ListCategories { reply } => {
                        let _ = reply.send(store.list_categories());
                    }
                    StoreCommand::Recipes { category, reply } => {
                        let _ = reply.send(store.recipes(&category).map(<[Recipe]>::to_vec));
                    }
                }
            }

            tracing::debug!("Recipe store stopped");
        });

        Self { tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> StoreCommand,
    ) -> Result<T, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    pub async fn add_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        self.request(|reply| StoreCommand::AddRecipe { recipe, reply })
            .await?
    }

    /// Save a batch in one store operation; nothing is saved on error.
    pub async fn add_recipes(&self, recipes: Vec<Recipe>) -> Result<(), StoreError> {
        self.request(|reply| StoreCommand::AddRecipes { recipes, reply })
            .await?
    }

    pub async fn add_category(&self, name: &str) -> Result<(), StoreError> {
        let name = name.to_string();
        self.request(|reply| StoreCommand::AddCategory { name, reply })
            .await?
    }

    pub async fn delete_category(&self, name: &str) -> Result<usize, StoreError> {
        let name = name.to_string();
        self.request(|reply| StoreCommand::DeleteCategory { name, reply })
            .await?
    }

    pub async fn delete_recipe(&self, category: &str, index: usize) -> Result<Recipe, StoreError> {
        let category = category.to_string();
        self.request(|reply| StoreCommand::DeleteRecipe {
            category,
            index,
            reply,
        })
        .await?
    }

    pub async fn list_categories(&self) -> Result<Vec<String>, StoreError> {
        self.request(|reply| StoreCommand::ListCategories { reply })
            .await
    }

    pub async fn recipes(&self, category: &str) -> Result<Vec<Recipe>, StoreError> {
        let category = category.to_string();
        self.request(|reply| StoreCommand::Recipes { category, reply })
            .await?
    }
}
