use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::parse_id;
use crate::engine::pickups::{get_pickup, list_pickups, PickupDetail, PickupPage};
use crate::engine::query::ListParams;
use crate::engine::transition::{transition_pickup, TransitionPayload};
use crate::error::AppError;
use crate::models::pickup::{CourierId, PickupRequest, PickupStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pickups", get(list))
        .route("/pickups/:id", get(detail))
        .route("/pickups/:id/status", patch(update_status))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub courier_id: Option<CourierId>,
    pub reason: Option<String>,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<PickupPage>, AppError> {
    Ok(Json(list_pickups(&state, &params).await?))
}

async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PickupDetail>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(get_pickup(&state, id).await?))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<PickupRequest>, AppError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let target = payload
        .status
        .parse::<PickupStatus>()
        .map_err(|err| AppError::InvalidFilter(err.to_string()))?;

    let updated = transition_pickup(
        &state,
        id,
        target,
        TransitionPayload {
            courier_id: payload.courier_id,
            reason: payload.reason,
        },
    )
    .await?;

    Ok(Json(updated))
}
