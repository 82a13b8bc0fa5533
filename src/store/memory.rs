use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{normalize_id, DishRepo, HealthCheck, IngredientRepo, ListRepo, ListWrite, UserRepo};
use crate::auth::repo_types::User;
use crate::dishes::repo_types::Dish;
use crate::ingredients::repo_types::Ingredient;
use crate::lists::repo_types::ShoppingList;

/// Process-local store. Records keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    ingredients: RwLock<Vec<Ingredient>>,
    dishes: RwLock<Vec<Dish>>,
    lists: RwLock<Vec<ShoppingList>>,
    users: RwLock<Vec<User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Ingredient {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Dish {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for ShoppingList {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for User {
    fn key(&self) -> &str {
        &self.id
    }
}

async fn get_one<T: Keyed + Clone>(rows: &RwLock<Vec<T>>, id: &str) -> Option<T> {
    let id = normalize_id(id);
    rows.read().await.iter().find(|r| r.key() == id).cloned()
}

async fn insert_one<T: Keyed + Clone>(rows: &RwLock<Vec<T>>, row: &T) -> anyhow::Result<()> {
    let mut guard = rows.write().await;
    if guard.iter().any(|r| r.key() == row.key()) {
        anyhow::bail!("duplicate id {}", row.key());
    }
    guard.push(row.clone());
    Ok(())
}

async fn replace_one<T: Keyed + Clone>(rows: &RwLock<Vec<T>>, row: &T) -> bool {
    let id = normalize_id(row.key());
    let mut guard = rows.write().await;
    match guard.iter_mut().find(|r| r.key() == id) {
        Some(slot) => {
            *slot = row.clone();
            true
        }
        None => false,
    }
}

/// Newest date first, later inserts first among equal dates.
fn page<'a>(
    lists: impl DoubleEndedIterator<Item = &'a ShoppingList>,
    limit: i64,
    offset: i64,
) -> Vec<ShoppingList> {
    let mut lists: Vec<&ShoppingList> = lists.rev().collect();
    lists.sort_by(|a, b| b.date.cmp(&a.date));
    lists
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

async fn delete_one<T: Keyed>(rows: &RwLock<Vec<T>>, id: &str) -> bool {
    let id = normalize_id(id);
    let mut guard = rows.write().await;
    let before = guard.len();
    guard.retain(|r| r.key() != id);
    guard.len() != before
}

#[async_trait]
impl IngredientRepo for MemoryStore {
    async fn list_ingredients(&self) -> anyhow::Result<Vec<Ingredient>> {
        Ok(self.ingredients.read().await.clone())
    }

    async fn get_ingredient(&self, id: &str) -> anyhow::Result<Option<Ingredient>> {
        Ok(get_one(&self.ingredients, id).await)
    }

    async fn create_ingredient(&self, ingredient: &Ingredient) -> anyhow::Result<()> {
        insert_one(&self.ingredients, ingredient).await
    }

    async fn replace_ingredient(&self, ingredient: &Ingredient) -> anyhow::Result<bool> {
        Ok(replace_one(&self.ingredients, ingredient).await)
    }

    async fn delete_ingredient(&self, id: &str) -> anyhow::Result<bool> {
        Ok(delete_one(&self.ingredients, id).await)
    }
}

#[async_trait]
impl DishRepo for MemoryStore {
    async fn list_dishes(&self) -> anyhow::Result<Vec<Dish>> {
        Ok(self.dishes.read().await.clone())
    }

    async fn get_dish(&self, id: &str) -> anyhow::Result<Option<Dish>> {
        Ok(get_one(&self.dishes, id).await)
    }

    async fn create_dish(&self, dish: &Dish) -> anyhow::Result<()> {
        insert_one(&self.dishes, dish).await
    }

    async fn replace_dish(&self, dish: &Dish) -> anyhow::Result<bool> {
        Ok(replace_one(&self.dishes, dish).await)
    }

    async fn delete_dish(&self, id: &str) -> anyhow::Result<bool> {
        Ok(delete_one(&self.dishes, id).await)
    }
}

#[async_trait]
impl ListRepo for MemoryStore {
    async fn list_lists(&self) -> anyhow::Result<Vec<ShoppingList>> {
        Ok(self.lists.read().await.clone())
    }

    async fn page_lists(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<ShoppingList>> {
        let guard = self.lists.read().await;
        Ok(page(guard.iter(), limit, offset))
    }

    async fn list_lists_by_owner(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<ShoppingList>> {
        let guard = self.lists.read().await;
        Ok(page(
            guard.iter().filter(|l| l.owner_id == owner_id),
            limit,
            offset,
        ))
    }

    async fn get_list(&self, id: &str) -> anyhow::Result<Option<ShoppingList>> {
        Ok(get_one(&self.lists, id).await)
    }

    async fn create_list(&self, list: &ShoppingList) -> anyhow::Result<()> {
        insert_one(&self.lists, list).await
    }

    async fn replace_list(&self, list: &ShoppingList) -> anyhow::Result<ListWrite> {
        let id = normalize_id(&list.id);
        let mut guard = self.lists.write().await;
        let Some(slot) = guard.iter_mut().find(|l| l.id == id) else {
            return Ok(ListWrite::Missing);
        };
        if slot.revision != list.revision {
            return Ok(ListWrite::Stale);
        }
        *slot = ShoppingList {
            revision: list.revision + 1,
            ..list.clone()
        };
        Ok(ListWrite::Replaced)
    }

    async fn delete_list(&self, id: &str) -> anyhow::Result<bool> {
        Ok(delete_one(&self.lists, id).await)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> anyhow::Result<Option<User>> {
        Ok(get_one(&self.users, id).await)
    }

    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            anyhow::bail!("duplicate email {}", user.email);
        }
        insert_one(&self.users, user).await
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
