use crate::state::AppState;
use axum::Router;

pub mod access;
pub mod dto;
pub mod handlers;
pub mod materialize;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
