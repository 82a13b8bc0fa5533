use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateIngredientRequest, UpdateIngredientRequest};
use super::repo_types::Ingredient;
use super::services;
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route(
            "/ingredients/:id",
            get(get_ingredient)
                .put(update_ingredient)
                .delete(delete_ingredient),
        )
}

#[instrument(skip(state))]
pub async fn list_ingredients(State(state): State<AppState>) -> AppResult<Json<Vec<Ingredient>>> {
    Ok(Json(services::list_ingredients(&state).await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Ingredient>> {
    services::get_ingredient(&state, &id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("ingredient"))
}

#[instrument(skip(state, _user, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateIngredientRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<Ingredient>)> {
    let ingredient = services::create_ingredient(&state, payload).await?;
    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/ingredients/{}", ingredient.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(ingredient)))
}

#[instrument(skip(state, _user, payload))]
pub async fn update_ingredient(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateIngredientRequest>,
) -> AppResult<Json<Ingredient>> {
    services::update_ingredient(&state, &id, payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("ingredient"))
}

#[instrument(skip(state, _user))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if services::delete_ingredient(&state, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("ingredient"))
    }
}
