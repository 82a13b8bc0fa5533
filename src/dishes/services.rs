use tracing::{info, warn};

use super::dto::{CreateDishRequest, UpdateDishRequest};
use super::repo_types::{Dish, DishIngredient};
use crate::cascade::on_dish_deleted;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{new_id, normalize_id};
use crate::validation::{check_id, check_length, check_quantity, check_unit, DISH_UNITS, NAME_MAX, NAME_MIN};

/// Validates the refs and canonicalizes their ingredient ids.
fn prepare_ingredients(refs: Vec<DishIngredient>) -> AppResult<Vec<DishIngredient>> {
    if refs.is_empty() {
        return Err(AppError::validation("a dish needs at least one ingredient"));
    }
    refs.into_iter()
        .map(|r| {
            check_id("ingredientId", &r.ingredient_id)?;
            check_quantity(r.quantity)?;
            check_unit(r.unit.as_deref(), DISH_UNITS)?;
            Ok(DishIngredient {
                ingredient_id: normalize_id(&r.ingredient_id),
                ..r
            })
        })
        .collect()
}

pub async fn list_dishes(st: &AppState) -> AppResult<Vec<Dish>> {
    Ok(st.repos.dishes.list_dishes().await?)
}

pub async fn get_dish(st: &AppState, id: &str) -> AppResult<Option<Dish>> {
    Ok(st.repos.dishes.get_dish(id).await?)
}

pub async fn create_dish(st: &AppState, req: CreateDishRequest) -> AppResult<Dish> {
    check_length("name", &req.name, NAME_MIN, NAME_MAX)?;
    let dish = Dish {
        id: new_id(),
        name: req.name,
        ingredients: prepare_ingredients(req.ingredients)?,
    };
    st.repos.dishes.create_dish(&dish).await?;
    info!(dish_id = %dish.id, refs = dish.ingredients.len(), "dish created");
    Ok(dish)
}

/// Lists already built from this dish are not recomputed.
pub async fn update_dish(st: &AppState, id: &str, req: UpdateDishRequest) -> AppResult<Option<Dish>> {
    if let Some(name) = &req.name {
        check_length("name", name, NAME_MIN, NAME_MAX)?;
    }
    let ingredients = req.ingredients.map(prepare_ingredients).transpose()?;

    let Some(mut dish) = st.repos.dishes.get_dish(id).await? else {
        return Ok(None);
    };
    if let Some(name) = req.name {
        dish.name = name;
    }
    if let Some(ingredients) = ingredients {
        dish.ingredients = ingredients;
    }
    if !st.repos.dishes.replace_dish(&dish).await? {
        return Ok(None);
    }
    Ok(Some(dish))
}

/// Deletes the dish, then drops it from every list and rebuilds those lists.
/// Succeeds once the delete is committed, whatever the cascade outcome.
pub async fn delete_dish(st: &AppState, id: &str) -> AppResult<bool> {
    if !st.repos.dishes.delete_dish(id).await? {
        return Ok(false);
    }
    info!(dish_id = %id, "dish deleted");
    let report = on_dish_deleted(&st.repos, id).await;
    if !report.is_complete() {
        warn!(dish_id = %id, ?report, "dish cascade incomplete");
    }
    Ok(true)
}
