use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app::reject,
    auth::{
        dto::check_name,
        extractors::{AdminUser, AuthUser},
    },
    state::AppState,
    users::dto::{MessageResponse, UpdateUserRequest, UserDto},
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).put(update_me))
        .route("/users/:id", get(get_user))
        .route(
            "/users/:id/roles/:role_name",
            post(assign_role).delete(remove_role),
        )
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserDto>, (StatusCode, String)> {
    let profile = state.identity.get_profile(user.id).await.map_err(reject)?;
    Ok(Json(profile))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserDto>, (StatusCode, String)> {
    check_name("first_name", payload.first_name.as_deref())
        .and_then(|_| check_name("last_name", payload.last_name.as_deref()))
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    let profile = state
        .identity
        .update_profile(user.id, payload)
        .await
        .map_err(reject)?;
    Ok(Json(profile))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDto>, (StatusCode, String)> {
    let profile = state.identity.get_profile(id).await.map_err(reject)?;
    Ok(Json(profile))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn assign_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((id, role_name)): Path<(Uuid, String)>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let assigned = state
        .identity
        .assign_role(id, &role_name)
        .await
        .map_err(reject)?;
    if !assigned {
        return Err((StatusCode::BAD_REQUEST, "Role already assigned".into()));
    }

    Ok(Json(MessageResponse {
        message: format!("Role {role_name} assigned successfully"),
    }))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn remove_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((id, role_name)): Path<(Uuid, String)>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let removed = state
        .identity
        .remove_role(id, &role_name)
        .await
        .map_err(reject)?;
    if !removed {
        return Err((StatusCode::BAD_REQUEST, "Role not assigned".into()));
    }

    Ok(Json(MessageResponse {
        message: format!("Role {role_name} removed successfully"),
    }))
}
