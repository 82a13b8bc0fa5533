//! Persistence seams. Each collection is a trait so services can run against
//! PostgreSQL in production and the in-memory store in tests.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::dishes::repo_types::Dish;
use crate::ingredients::repo_types::Ingredient;
use crate::lists::repo_types::ShoppingList;

pub mod memory;
pub mod postgres;

#[async_trait]
pub trait IngredientRepo: Send + Sync {
    async fn list_ingredients(&self) -> anyhow::Result<Vec<Ingredient>>;
    async fn get_ingredient(&self, id: &str) -> anyhow::Result<Option<Ingredient>>;
    async fn create_ingredient(&self, ingredient: &Ingredient) -> anyhow::Result<()>;
    /// Returns false when no ingredient has this id.
    async fn replace_ingredient(&self, ingredient: &Ingredient) -> anyhow::Result<bool>;
    async fn delete_ingredient(&self, id: &str) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait DishRepo: Send + Sync {
    async fn list_dishes(&self) -> anyhow::Result<Vec<Dish>>;
    async fn get_dish(&self, id: &str) -> anyhow::Result<Option<Dish>>;
    async fn create_dish(&self, dish: &Dish) -> anyhow::Result<()>;
    async fn replace_dish(&self, dish: &Dish) -> anyhow::Result<bool>;
    async fn delete_dish(&self, id: &str) -> anyhow::Result<bool>;
}

/// Result of a guarded list write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListWrite {
    Replaced,
    Missing,
    /// The stored revision no longer matches the one the caller read.
    Stale,
}

#[async_trait]
pub trait ListRepo: Send + Sync {
    /// Every list, unpaged. Used by cascades.
    async fn list_lists(&self) -> anyhow::Result<Vec<ShoppingList>>;
    async fn page_lists(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<ShoppingList>>;
    async fn list_lists_by_owner(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<ShoppingList>>;
    async fn get_list(&self, id: &str) -> anyhow::Result<Option<ShoppingList>>;
    async fn create_list(&self, list: &ShoppingList) -> anyhow::Result<()>;
    /// Writes `list` only if the stored revision equals `list.revision`, then
    /// bumps the stored revision.
    async fn replace_list(&self, list: &ShoppingList) -> anyhow::Result<ListWrite>;
    async fn delete_list(&self, id: &str) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: &str) -> anyhow::Result<Option<User>>;
    async fn create_user(&self, user: &User) -> anyhow::Result<()>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Handles to every collection, shared through `AppState`.
#[derive(Clone)]
pub struct Repos {
    pub ingredients: Arc<dyn IngredientRepo>,
    pub dishes: Arc<dyn DishRepo>,
    pub lists: Arc<dyn ListRepo>,
    pub users: Arc<dyn UserRepo>,
    pub health: Arc<dyn HealthCheck>,
}

impl Repos {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: IngredientRepo + DishRepo + ListRepo + UserRepo + HealthCheck + 'static,
    {
        Self {
            ingredients: store.clone() as Arc<dyn IngredientRepo>,
            dishes: store.clone() as Arc<dyn DishRepo>,
            lists: store.clone() as Arc<dyn ListRepo>,
            users: store.clone() as Arc<dyn UserRepo>,
            health: store as Arc<dyn HealthCheck>,
        }
    }
}

/// Fresh opaque id for a new record.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Canonical form of an incoming id: UUIDs in any accepted encoding become
/// lowercase hyphenated, anything else is compared verbatim.
pub fn normalize_id(id: &str) -> String {
    let trimmed = id.trim();
    match Uuid::parse_str(trimmed) {
        Ok(uuid) => uuid.hyphenated().to_string(),
        Err(_) => trimmed.to_string(),
    }
}
