use std::net::SocketAddr;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::state::AppState;
use crate::users::errors::IdentityError;
use crate::{auth, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(users::router()),
        )
        .route("/", get(service_info))
        .route("/health", get(|| async { "ok" }))
        .route("/health/live", get(|| async { "ok" }))
        .route("/health/ready", get(ready))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Maps a use-case error onto a status code. Internal details stay in the log.
pub(crate) fn reject(e: IdentityError) -> (StatusCode, String) {
    match e {
        IdentityError::Conflict => (StatusCode::CONFLICT, e.to_string()),
        IdentityError::Unauthenticated => (StatusCode::UNAUTHORIZED, e.to_string()),
        IdentityError::Forbidden => (StatusCode::FORBIDDEN, e.to_string()),
        IdentityError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        IdentityError::Internal(detail) => {
            error!(error = %detail, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred".into(),
            )
        }
    }
}

async fn service_info(State(state): State<AppState>) -> Json<Value> {
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "service": "User Service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "issuer": state.config.jwt.issuer,
        "timestamp": now,
    }))
}

async fn ready(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.identity.store_ready().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            error!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}
