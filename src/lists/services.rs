use time::OffsetDateTime;
use tracing::{info, warn};

use super::access::{ensure_access, owner_for_new_list, visible_lists, ListScope};
use super::dto::{CreateListRequest, ListItemInput, Pagination, UpdateListRequest};
use super::materialize::{materialize, MaterializeInput};
use super::repo_types::ShoppingList;
use crate::auth::claims::Caller;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{new_id, normalize_id, ListWrite};
use crate::validation::{
    check_id, check_length, check_optional_max, check_quantity, check_unit, AISLE_MAX,
    INGREDIENT_NAME_MAX, LIST_ITEM_UNITS, NAME_MAX, NAME_MIN,
};

fn validate_items(items: &[ListItemInput]) -> AppResult<()> {
    for item in items {
        check_id("ingredientId", &item.ingredient_id)?;
        check_length("ingredientName", &item.ingredient_name, NAME_MIN, INGREDIENT_NAME_MAX)?;
        check_quantity(item.quantity)?;
        check_unit(item.unit.as_deref(), LIST_ITEM_UNITS)?;
        check_optional_max("aisle", item.aisle.as_deref(), AISLE_MAX)?;
    }
    Ok(())
}

fn normalize_dish_ids(dish_ids: Vec<String>) -> AppResult<Vec<String>> {
    dish_ids
        .into_iter()
        .map(|id| {
            check_id("dishIds", &id)?;
            Ok(normalize_id(&id))
        })
        .collect()
}

async fn rematerialize(
    st: &AppState,
    list: &mut ShoppingList,
    manual: Option<&[ListItemInput]>,
) -> anyhow::Result<()> {
    let items = materialize(
        st.repos.ingredients.as_ref(),
        st.repos.dishes.as_ref(),
        MaterializeInput {
            dish_ids: &list.dish_ids,
            manual,
            prior: &list.items,
        },
    )
    .await?;
    list.items = items;
    Ok(())
}

/// Persists an edited list. `Ok(false)` when it vanished meanwhile.
async fn save_list(st: &AppState, list: &mut ShoppingList) -> AppResult<bool> {
    match st.repos.lists.replace_list(list).await? {
        ListWrite::Replaced => {
            list.revision += 1;
            Ok(true)
        }
        ListWrite::Missing => Ok(false),
        ListWrite::Stale => {
            warn!(list_id = %list.id, "list changed since it was read");
            Err(AppError::Conflict(
                "list was modified concurrently, reload and retry".into(),
            ))
        }
    }
}

pub async fn list_lists(
    st: &AppState,
    caller: Option<&Caller>,
    page: &Pagination,
) -> AppResult<Vec<ShoppingList>> {
    let (limit, offset) = (page.limit.max(0), page.offset.max(0));
    let lists = match visible_lists(caller)? {
        ListScope::All => st.repos.lists.page_lists(limit, offset).await?,
        ListScope::OwnedBy(owner_id) => {
            st.repos
                .lists
                .list_lists_by_owner(&owner_id, limit, offset)
                .await?
        }
    };
    Ok(lists)
}

pub async fn get_list(
    st: &AppState,
    caller: Option<&Caller>,
    id: &str,
) -> AppResult<Option<ShoppingList>> {
    let Some(list) = st.repos.lists.get_list(id).await? else {
        return Ok(None);
    };
    ensure_access(caller, &list)?;
    Ok(Some(list))
}

pub async fn create_list(
    st: &AppState,
    caller: Option<&Caller>,
    req: CreateListRequest,
) -> AppResult<ShoppingList> {
    let owner_id = owner_for_new_list(caller)?;
    check_length("name", &req.name, NAME_MIN, NAME_MAX)?;
    if let Some(items) = &req.items {
        validate_items(items)?;
    }
    let dish_ids = normalize_dish_ids(req.dish_ids.unwrap_or_default())?;

    let mut list = ShoppingList {
        id: new_id(),
        name: req.name,
        date: req.date.unwrap_or_else(OffsetDateTime::now_utc),
        items: Vec::new(),
        dish_ids,
        owner_id,
        revision: 0,
    };
    rematerialize(st, &mut list, req.items.as_deref()).await?;

    st.repos.lists.create_list(&list).await?;
    info!(list_id = %list.id, owner_id = %list.owner_id, items = list.items.len(), "list created");
    Ok(list)
}

/// Applies the edit and re-materializes the list against its previous items.
/// Ownership is checked before the body is validated.
///
/// Omitted `items` means no manual entries: the list is rebuilt from its
/// dishes alone.
pub async fn update_list(
    st: &AppState,
    caller: Option<&Caller>,
    id: &str,
    req: UpdateListRequest,
) -> AppResult<Option<ShoppingList>> {
    let Some(mut list) = st.repos.lists.get_list(id).await? else {
        return Ok(None);
    };
    ensure_access(caller, &list)?;

    if let Some(name) = &req.name {
        check_length("name", name, NAME_MIN, NAME_MAX)?;
    }
    if let Some(items) = &req.items {
        validate_items(items)?;
    }
    let dish_ids = req.dish_ids.map(normalize_dish_ids).transpose()?;

    if let Some(name) = req.name {
        list.name = name;
    }
    if let Some(date) = req.date {
        list.date = date;
    }
    if let Some(dish_ids) = dish_ids {
        list.dish_ids = dish_ids;
    }
    rematerialize(st, &mut list, req.items.as_deref()).await?;

    if !save_list(st, &mut list).await? {
        return Ok(None);
    }
    info!(list_id = %list.id, items = list.items.len(), "list updated");
    Ok(Some(list))
}

pub async fn delete_list(st: &AppState, caller: Option<&Caller>, id: &str) -> AppResult<bool> {
    let Some(list) = st.repos.lists.get_list(id).await? else {
        return Ok(false);
    };
    ensure_access(caller, &list)?;
    let deleted = st.repos.lists.delete_list(&list.id).await?;
    if deleted {
        info!(list_id = %list.id, "list deleted");
    }
    Ok(deleted)
}

/// Flips one item's checked flag without re-materializing the list.
pub async fn set_item_checked(
    st: &AppState,
    caller: Option<&Caller>,
    list_id: &str,
    ingredient_id: &str,
    checked: bool,
) -> AppResult<Option<ShoppingList>> {
    let Some(mut list) = st.repos.lists.get_list(list_id).await? else {
        return Ok(None);
    };
    ensure_access(caller, &list)?;

    let ingredient_id = normalize_id(ingredient_id);
    let item = list
        .items
        .iter_mut()
        .find(|i| i.ingredient_id == ingredient_id)
        .ok_or(AppError::NotFound("list item"))?;
    item.checked = checked;

    if !save_list(st, &mut list).await? {
        return Ok(None);
    }
    Ok(Some(list))
}
