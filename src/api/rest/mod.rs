pub mod couriers;
pub mod dropboxes;
pub mod pickups;
pub mod waste;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::engine::query::{parse_courier_id, PickupFilter};
use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(pickups::router())
        .merge(couriers::router())
        .merge(waste::router())
        .merge(dropboxes::router());

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parses a positive integer id from a path segment.
pub(crate) fn parse_id(raw: &str) -> Result<i64, AppError> {
    parse_courier_id(raw).map_err(|_| {
        AppError::InvalidFilter(format!("id must be a positive integer (got '{raw}')"))
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    pickups: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let pickups = state.pickups.count(&PickupFilter::default()).await?;

    Ok(Json(HealthResponse {
        status: "ok",
        pickups,
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
