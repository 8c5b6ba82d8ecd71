use crate::domain::model::RecipeArgs;
use crate::utils::error::{DatasetError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type RecipeFn<D> = Arc<dyn Fn(D, &RecipeArgs) -> Result<D> + Send + Sync>;

/// Named transformations from processed data to a variant of it.
pub struct RecipeRegistry<D> {
    recipes: BTreeMap<String, RecipeFn<D>>,
}

impl<D> RecipeRegistry<D> {
    pub fn new() -> Self {
        Self {
            recipes: BTreeMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: &str, recipe: F) -> Result<&mut Self>
    where
        F: Fn(D, &RecipeArgs) -> Result<D> + Send + Sync + 'static,
    {
        if self.recipes.contains_key(name) {
            return Err(DatasetError::DuplicateRecipe {
                recipe: name.to_string(),
            });
        }
        self.recipes.insert(name.to_string(), Arc::new(recipe));
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<RecipeFn<D>> {
        self.recipes
            .get(name)
            .cloned()
            .ok_or_else(|| DatasetError::RecipeNotFound {
                recipe: name.to_string(),
                available: self.available(),
            })
    }

    pub fn apply(&self, name: &str, data: D, args: &RecipeArgs) -> Result<D> {
        let recipe = self.get(name)?;
        tracing::debug!("🍳 Applying recipe '{}' with {} argument(s)", name, args.len());
        recipe(data, args)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.recipes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    fn available(&self) -> String {
        if self.recipes.is_empty() {
            "none".to_string()
        } else {
            self.names().join(", ")
        }
    }
}

impl<D> Default for RecipeRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for RecipeRegistry<D> {
    fn clone(&self) -> Self {
        Self {
            recipes: self.recipes.clone(),
        }
    }
}

// Argument accessors shared by the built-in recipes.

pub fn required_str<'a>(recipe: &str, args: &'a RecipeArgs, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| DatasetError::recipe_failed(recipe, format!("missing string argument '{}'", key)))
}

pub fn optional_f64(recipe: &str, args: &RecipeArgs, key: &str) -> Result<Option<f64>> {
    match args.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
            DatasetError::recipe_failed(recipe, format!("argument '{}' must be a number", key))
        }),
    }
}

pub fn optional_usize(recipe: &str, args: &RecipeArgs, key: &str) -> Result<Option<usize>> {
    match args.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(|n| Some(n as usize)).ok_or_else(|| {
            DatasetError::recipe_failed(
                recipe,
                format!("argument '{}' must be a non-negative integer", key),
            )
        }),
    }
}

/// Accepts either a single string or an array of strings.
pub fn string_list(recipe: &str, args: &RecipeArgs, key: &str) -> Result<Option<Vec<String>>> {
    match args.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(vec![s.clone()])),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    DatasetError::recipe_failed(
                        recipe,
                        format!("argument '{}' must only contain strings", key),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(_) => Err(DatasetError::recipe_failed(
            recipe,
            format!("argument '{}' must be a string or a list of strings", key),
        )),
    }
}
