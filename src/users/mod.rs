use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod errors;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod pg;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::users_routes())
}
