use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateDishRequest, UpdateDishRequest};
use super::repo_types::Dish;
use super::services;
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dishes", get(list_dishes).post(create_dish))
        .route(
            "/dishes/:id",
            get(get_dish).put(update_dish).delete(delete_dish),
        )
}

#[instrument(skip(state))]
pub async fn list_dishes(State(state): State<AppState>) -> AppResult<Json<Vec<Dish>>> {
    Ok(Json(services::list_dishes(&state).await?))
}

#[instrument(skip(state))]
pub async fn get_dish(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Dish>> {
    services::get_dish(&state, &id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("dish"))
}

#[instrument(skip(state, _user, payload))]
pub async fn create_dish(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateDishRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<Dish>)> {
    let dish = services::create_dish(&state, payload).await?;
    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/dishes/{}", dish.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(dish)))
}

#[instrument(skip(state, _user, payload))]
pub async fn update_dish(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateDishRequest>,
) -> AppResult<Json<Dish>> {
    services::update_dish(&state, &id, payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("dish"))
}

#[instrument(skip(state, _user))]
pub async fn delete_dish(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if services::delete_dish(&state, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("dish"))
    }
}
