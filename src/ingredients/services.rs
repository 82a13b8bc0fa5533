use tracing::{info, warn};

use super::dto::{CreateIngredientRequest, UpdateIngredientRequest};
use super::repo_types::Ingredient;
use crate::cascade::on_ingredient_deleted;
use crate::error::AppResult;
use crate::state::AppState;
use crate::store::new_id;
use crate::validation::{check_length, check_optional_max, AISLE_MAX, INGREDIENT_NAME_MAX, NAME_MIN};

pub async fn list_ingredients(st: &AppState) -> AppResult<Vec<Ingredient>> {
    Ok(st.repos.ingredients.list_ingredients().await?)
}

pub async fn get_ingredient(st: &AppState, id: &str) -> AppResult<Option<Ingredient>> {
    Ok(st.repos.ingredients.get_ingredient(id).await?)
}

pub async fn create_ingredient(st: &AppState, req: CreateIngredientRequest) -> AppResult<Ingredient> {
    check_length("name", &req.name, NAME_MIN, INGREDIENT_NAME_MAX)?;
    check_optional_max("aisle", req.aisle.as_deref(), AISLE_MAX)?;

    let ingredient = Ingredient {
        id: new_id(),
        name: req.name,
        aisle: req.aisle,
    };
    st.repos.ingredients.create_ingredient(&ingredient).await?;
    info!(ingredient_id = %ingredient.id, name = %ingredient.name, "ingredient created");
    Ok(ingredient)
}

/// Renames or re-shelves an ingredient. Existing list lines keep their snapshot.
pub async fn update_ingredient(
    st: &AppState,
    id: &str,
    req: UpdateIngredientRequest,
) -> AppResult<Option<Ingredient>> {
    if let Some(name) = &req.name {
        check_length("name", name, NAME_MIN, INGREDIENT_NAME_MAX)?;
    }
    check_optional_max("aisle", req.aisle.as_deref(), AISLE_MAX)?;

    let Some(mut ingredient) = st.repos.ingredients.get_ingredient(id).await? else {
        return Ok(None);
    };
    if let Some(name) = req.name {
        ingredient.name = name;
    }
    if let Some(aisle) = req.aisle {
        ingredient.aisle = Some(aisle);
    }
    if !st.repos.ingredients.replace_ingredient(&ingredient).await? {
        return Ok(None);
    }
    Ok(Some(ingredient))
}

/// Deletes the ingredient, then purges it from dishes and lists.
///
/// Once the delete is committed the call succeeds; cascade trouble is only
/// logged.
pub async fn delete_ingredient(st: &AppState, id: &str) -> AppResult<bool> {
    if !st.repos.ingredients.delete_ingredient(id).await? {
        return Ok(false);
    }
    info!(ingredient_id = %id, "ingredient deleted");
    let report = on_ingredient_deleted(&st.repos, id).await;
    if !report.is_complete() {
        warn!(ingredient_id = %id, ?report, "ingredient cascade incomplete");
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::auth::claims::{Caller, Role};
    use crate::dishes::repo_types::{Dish, DishIngredient};
    use crate::error::AppError;
    use crate::lists::dto::CreateListRequest;
    use crate::lists::repo_types::ShoppingList;
    use crate::lists::services::create_list;
    use crate::store::{ListRepo, ListWrite};

    #[tokio::test]
    async fn create_update_and_delete() {
        let st = AppState::fake();
        let created = create_ingredient(
            &st,
            CreateIngredientRequest {
                name: "Crème fraîche".into(),
                aisle: Some("Frais".into()),
            },
        )
        .await
        .unwrap();

        let updated = update_ingredient(
            &st,
            &created.id,
            UpdateIngredientRequest {
                name: Some("Crème épaisse".into()),
                aisle: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.name, "Crème épaisse");
        assert_eq!(updated.aisle.as_deref(), Some("Frais"));

        assert!(delete_ingredient(&st, &created.id).await.unwrap());
        assert!(!delete_ingredient(&st, &created.id).await.unwrap());
        assert!(get_ingredient(&st, &created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_purges_dish_refs_and_list_lines() {
        let st = AppState::fake();
        let sugar = create_ingredient(
            &st,
            CreateIngredientRequest {
                name: "Sucre".into(),
                aisle: None,
            },
        )
        .await
        .unwrap();
        st.repos
            .dishes
            .create_dish(&Dish {
                id: "cake".into(),
                name: "Gâteau".into(),
                ingredients: vec![DishIngredient {
                    ingredient_id: sugar.id.clone(),
                    quantity: Some(100.0),
                    unit: Some("g".into()),
                }],
            })
            .await
            .unwrap();
        let owner = Caller::new("alice", Role::User);
        let list = create_list(
            &st,
            Some(&owner),
            CreateListRequest {
                name: "Semaine".into(),
                dish_ids: Some(vec!["cake".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(list.items.len(), 1);

        assert!(delete_ingredient(&st, &sugar.id).await.unwrap());

        let cake = st.repos.dishes.get_dish("cake").await.unwrap().unwrap();
        assert!(cake.ingredients.is_empty());
        let list = st.repos.lists.get_list(&list.id).await.unwrap().unwrap();
        assert!(list.items.is_empty());
    }

    struct UnreadableLists;

    #[async_trait]
    impl ListRepo for UnreadableLists {
        async fn list_lists(&self) -> anyhow::Result<Vec<ShoppingList>> {
            anyhow::bail!("connection reset")
        }
        async fn page_lists(&self, _: i64, _: i64) -> anyhow::Result<Vec<ShoppingList>> {
            anyhow::bail!("connection reset")
        }
        async fn list_lists_by_owner(
            &self,
            _: &str,
            _: i64,
            _: i64,
        ) -> anyhow::Result<Vec<ShoppingList>> {
            anyhow::bail!("connection reset")
        }
        async fn get_list(&self, _: &str) -> anyhow::Result<Option<ShoppingList>> {
            anyhow::bail!("connection reset")
        }
        async fn create_list(&self, _: &ShoppingList) -> anyhow::Result<()> {
            anyhow::bail!("connection reset")
        }
        async fn replace_list(&self, _: &ShoppingList) -> anyhow::Result<ListWrite> {
            anyhow::bail!("connection reset")
        }
        async fn delete_list(&self, _: &str) -> anyhow::Result<bool> {
            anyhow::bail!("connection reset")
        }
    }

    #[tokio::test]
    async fn committed_delete_succeeds_even_if_cascade_cannot_read_lists() {
        let mut st = AppState::fake();
        st.repos.lists = Arc::new(UnreadableLists) as Arc<dyn ListRepo>;
        let flour = create_ingredient(
            &st,
            CreateIngredientRequest {
                name: "Farine".into(),
                aisle: None,
            },
        )
        .await
        .unwrap();

        assert!(delete_ingredient(&st, &flour.id).await.unwrap());
        assert!(get_ingredient(&st, &flour.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_overlong_names() {
        let st = AppState::fake();
        let err = create_ingredient(
            &st,
            CreateIngredientRequest {
                name: "x".repeat(101),
                aisle: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
