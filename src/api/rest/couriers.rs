use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::api::rest::parse_id;
use crate::engine::pickups::{pickup_history, PickupPage};
use crate::engine::query::ListParams;
use crate::engine::totals::{calculate_totals, detailed_totals, TotalsParams};
use crate::error::AppError;
use crate::models::totals::{DetailedPickupTotals, PickupTotals};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers/:id/pickups", get(history))
        .route("/couriers/:id/totals", get(totals))
        .route("/couriers/:id/totals/detailed", get(totals_detailed))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<PickupPage>, AppError> {
    let courier_id = parse_id(&id)?;
    Ok(Json(pickup_history(&state, courier_id, &params).await?))
}

async fn totals(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<TotalsParams>,
) -> Result<Json<PickupTotals>, AppError> {
    let courier_id = parse_id(&id)?;
    Ok(Json(calculate_totals(&state, courier_id, &params).await?))
}

async fn totals_detailed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DetailedPickupTotals>, AppError> {
    let courier_id = parse_id(&id)?;
    Ok(Json(detailed_totals(&state, courier_id).await?))
}
