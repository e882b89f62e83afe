use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{instrument, warn};

use crate::{
    app::reject,
    auth::dto::{AuthResponse, LoginRequest, RegisterRequest},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    if let Err(msg) = payload.normalize_and_validate() {
        warn!(reason = %msg, "invalid registration");
        return Err((StatusCode::BAD_REQUEST, msg));
    }

    let res = state.identity.register(payload).await.map_err(reject)?;
    Ok(Json(res))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_string();

    let res = state.identity.login(payload).await.map_err(reject)?;
    Ok(Json(res))
}
