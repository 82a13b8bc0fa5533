use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateListRequest, Pagination, SetCheckedRequest, UpdateListRequest};
use super::repo_types::ShoppingList;
use super::services;
use crate::{
    auth::{claims::Caller, jwt::AuthUser},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/lists", get(list_lists).post(create_list))
        .route(
            "/lists/:id",
            get(get_list).put(update_list).delete(delete_list),
        )
        .route("/lists/:id/items/:ingredient_id", patch(set_item_checked))
}

fn caller(user: &Option<AuthUser>) -> Option<&Caller> {
    user.as_ref().map(|AuthUser(c)| c)
}

#[instrument(skip(state, user))]
pub async fn list_lists(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<ShoppingList>>> {
    Ok(Json(services::list_lists(&state, caller(&user), &page).await?))
}

#[instrument(skip(state, user))]
pub async fn get_list(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ShoppingList>> {
    services::get_list(&state, caller(&user), &id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("list"))
}

#[instrument(skip(state, user, payload))]
pub async fn create_list(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(payload): Json<CreateListRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<ShoppingList>)> {
    let list = services::create_list(&state, caller(&user), payload).await?;
    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/lists/{}", list.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(list)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_list(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateListRequest>,
) -> AppResult<Json<ShoppingList>> {
    services::update_list(&state, caller(&user), &id, payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("list"))
}

#[instrument(skip(state, user))]
pub async fn delete_list(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if services::delete_list(&state, caller(&user), &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("list"))
    }
}

#[instrument(skip(state, user, payload))]
pub async fn set_item_checked(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path((id, ingredient_id)): Path<(String, String)>,
    Json(payload): Json<SetCheckedRequest>,
) -> AppResult<Json<ShoppingList>> {
    services::set_item_checked(&state, caller(&user), &id, &ingredient_id, payload.checked)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("list"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Role;

    fn as_user(id: &str) -> Option<AuthUser> {
        Some(AuthUser(Caller::new(id, Role::User)))
    }

    fn new_list(name: &str) -> CreateListRequest {
        CreateListRequest {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_returns_201_with_location() {
        let state = AppState::fake();
        let (status, headers, Json(list)) =
            create_list(State(state.clone()), as_user("alice"), Json(new_list("Courses")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let location = headers.get(header::LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, format!("/api/v1/lists/{}", list.id));
        assert_eq!(list.owner_id, "alice");
    }

    #[tokio::test]
    async fn anonymous_create_is_unauthenticated() {
        let state = AppState::fake();
        let err = create_list(State(state), None, Json(new_list("Courses")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_list_is_404_and_foreign_list_is_403() {
        let state = AppState::fake();
        let err = get_list(State(state.clone()), as_user("alice"), Path("nope".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let (_, _, Json(list)) =
            create_list(State(state.clone()), as_user("alice"), Json(new_list("Courses")))
                .await
                .unwrap();
        let err = get_list(State(state.clone()), as_user("bob"), Path(list.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "LIST_FORBIDDEN");

        let status = delete_list(State(state.clone()), as_user("alice"), Path(list.id.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        let err = delete_list(State(state), as_user("alice"), Path(list.id))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_uses_pagination() {
        let state = AppState::fake();
        for name in ["a", "b", "c"] {
            create_list(State(state.clone()), as_user("alice"), Json(new_list(name)))
                .await
                .unwrap();
        }
        let Json(page) = list_lists(
            State(state),
            as_user("alice"),
            Query(Pagination { limit: 2, offset: 1 }),
        )
        .await
        .unwrap();
        assert_eq!(page.len(), 2);
    }
}
