use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};

use super::{normalize_id, DishRepo, HealthCheck, IngredientRepo, ListRepo, ListWrite, UserRepo};
use crate::auth::repo_types::User;
use crate::dishes::repo_types::{Dish, DishRow};
use crate::ingredients::repo_types::Ingredient;
use crate::lists::repo_types::{ShoppingList, ShoppingListRow};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IngredientRepo for PgStore {
    async fn list_ingredients(&self) -> anyhow::Result<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, aisle
              FROM ingredients
             ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("list ingredients")?;
        Ok(rows)
    }

    async fn get_ingredient(&self, id: &str) -> anyhow::Result<Option<Ingredient>> {
        let row = sqlx::query_as::<_, Ingredient>(
            r#"SELECT id, name, aisle FROM ingredients WHERE id = $1"#,
        )
        .bind(normalize_id(id))
        .fetch_optional(&self.pool)
        .await
        .context("get ingredient")?;
        Ok(row)
    }

    async fn create_ingredient(&self, ingredient: &Ingredient) -> anyhow::Result<()> {
        sqlx::query(r#"INSERT INTO ingredients (id, name, aisle) VALUES ($1, $2, $3)"#)
            .bind(&ingredient.id)
            .bind(&ingredient.name)
            .bind(&ingredient.aisle)
            .execute(&self.pool)
            .await
            .context("insert ingredient")?;
        Ok(())
    }

    async fn replace_ingredient(&self, ingredient: &Ingredient) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"UPDATE ingredients SET name = $2, aisle = $3 WHERE id = $1"#)
            .bind(normalize_id(&ingredient.id))
            .bind(&ingredient.name)
            .bind(&ingredient.aisle)
            .execute(&self.pool)
            .await
            .context("update ingredient")?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_ingredient(&self, id: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM ingredients WHERE id = $1"#)
            .bind(normalize_id(id))
            .execute(&self.pool)
            .await
            .context("delete ingredient")?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl DishRepo for PgStore {
    async fn list_dishes(&self) -> anyhow::Result<Vec<Dish>> {
        let rows = sqlx::query_as::<_, DishRow>(
            r#"
            SELECT id, name, ingredients
              FROM dishes
             ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("list dishes")?;
        Ok(rows.into_iter().map(Dish::from).collect())
    }

    async fn get_dish(&self, id: &str) -> anyhow::Result<Option<Dish>> {
        let row = sqlx::query_as::<_, DishRow>(
            r#"SELECT id, name, ingredients FROM dishes WHERE id = $1"#,
        )
        .bind(normalize_id(id))
        .fetch_optional(&self.pool)
        .await
        .context("get dish")?;
        Ok(row.map(Dish::from))
    }

    async fn create_dish(&self, dish: &Dish) -> anyhow::Result<()> {
        sqlx::query(r#"INSERT INTO dishes (id, name, ingredients) VALUES ($1, $2, $3)"#)
            .bind(&dish.id)
            .bind(&dish.name)
            .bind(Json(&dish.ingredients))
            .execute(&self.pool)
            .await
            .context("insert dish")?;
        Ok(())
    }

    async fn replace_dish(&self, dish: &Dish) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"UPDATE dishes SET name = $2, ingredients = $3 WHERE id = $1"#)
            .bind(normalize_id(&dish.id))
            .bind(&dish.name)
            .bind(Json(&dish.ingredients))
            .execute(&self.pool)
            .await
            .context("update dish")?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_dish(&self, id: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM dishes WHERE id = $1"#)
            .bind(normalize_id(id))
            .execute(&self.pool)
            .await
            .context("delete dish")?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl ListRepo for PgStore {
    async fn list_lists(&self) -> anyhow::Result<Vec<ShoppingList>> {
        let rows = sqlx::query_as::<_, ShoppingListRow>(
            r#"
            SELECT id, name, date, items, dish_ids, owner_id, revision
              FROM shopping_lists
             ORDER BY date DESC, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("list shopping lists")?;
        Ok(rows.into_iter().map(ShoppingList::from).collect())
    }

    async fn page_lists(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<ShoppingList>> {
        let rows = sqlx::query_as::<_, ShoppingListRow>(
            r#"
            SELECT id, name, date, items, dish_ids, owner_id, revision
              FROM shopping_lists
             ORDER BY date DESC, created_at DESC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("page shopping lists")?;
        Ok(rows.into_iter().map(ShoppingList::from).collect())
    }

    async fn list_lists_by_owner(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<ShoppingList>> {
        let rows = sqlx::query_as::<_, ShoppingListRow>(
            r#"
            SELECT id, name, date, items, dish_ids, owner_id, revision
              FROM shopping_lists
             WHERE owner_id = $1
             ORDER BY date DESC, created_at DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("list shopping lists by owner")?;
        Ok(rows.into_iter().map(ShoppingList::from).collect())
    }

    async fn get_list(&self, id: &str) -> anyhow::Result<Option<ShoppingList>> {
        let row = sqlx::query_as::<_, ShoppingListRow>(
            r#"
            SELECT id, name, date, items, dish_ids, owner_id, revision
              FROM shopping_lists
             WHERE id = $1
            "#,
        )
        .bind(normalize_id(id))
        .fetch_optional(&self.pool)
        .await
        .context("get shopping list")?;
        Ok(row.map(ShoppingList::from))
    }

    async fn create_list(&self, list: &ShoppingList) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shopping_lists (id, name, date, items, dish_ids, owner_id, revision)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&list.id)
        .bind(&list.name)
        .bind(list.date)
        .bind(Json(&list.items))
        .bind(Json(&list.dish_ids))
        .bind(&list.owner_id)
        .bind(list.revision)
        .execute(&self.pool)
        .await
        .context("insert shopping list")?;
        Ok(())
    }

    async fn replace_list(&self, list: &ShoppingList) -> anyhow::Result<ListWrite> {
        let id = normalize_id(&list.id);
        let res = sqlx::query(
            r#"
            UPDATE shopping_lists
               SET name = $2, date = $3, items = $4, dish_ids = $5, owner_id = $6,
                   revision = revision + 1
             WHERE id = $1 AND revision = $7
            "#,
        )
        .bind(&id)
        .bind(&list.name)
        .bind(list.date)
        .bind(Json(&list.items))
        .bind(Json(&list.dish_ids))
        .bind(&list.owner_id)
        .bind(list.revision)
        .execute(&self.pool)
        .await
        .context("update shopping list")?;
        if res.rows_affected() > 0 {
            return Ok(ListWrite::Replaced);
        }

        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM shopping_lists WHERE id = $1)"#)
                .bind(&id)
                .fetch_one(&self.pool)
                .await
                .context("check shopping list exists")?;
        Ok(if exists { ListWrite::Stale } else { ListWrite::Missing })
    }

    async fn delete_list(&self, id: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM shopping_lists WHERE id = $1"#)
            .bind(normalize_id(id))
            .execute(&self.pool)
            .await
            .context("delete shopping list")?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, pseudo, password_hash, is_superuser, created_at
              FROM users
             WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, pseudo, password_hash, is_superuser, created_at
              FROM users
             WHERE id = $1
            "#,
        )
        .bind(normalize_id(id))
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, pseudo, password_hash, is_superuser, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.pseudo)
        .bind(&user.password_hash)
        .bind(user.is_superuser)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .context("insert user")?;
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("ping database")?;
        Ok(())
    }
}
