use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::parse_id;
use crate::engine::catalog::{
    find_wastes_by_name, list_waste_types, list_wastes, wastes_by_type, WastePage,
};
use crate::engine::query::WasteListParams;
use crate::error::AppError;
use crate::models::waste::{WasteItem, WasteItemWithType, WasteType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/waste-types", get(list_types))
        .route("/waste-types/:id/wastes", get(by_type))
        .route("/wastes", get(list))
        .route("/wastes/search", get(search))
}

#[derive(Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

async fn list_types(State(state): State<Arc<AppState>>) -> Result<Json<Vec<WasteType>>, AppError> {
    Ok(Json(list_waste_types(&state).await?))
}

async fn by_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WasteItemWithType>>, AppError> {
    let waste_type_id = parse_id(&id)?;
    Ok(Json(wastes_by_type(&state, waste_type_id).await?))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WasteListParams>,
) -> Result<Json<WastePage>, AppError> {
    Ok(Json(list_wastes(&state, &params).await?))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Vec<WasteItem>>, AppError> {
    Ok(Json(find_wastes_by_name(&state, query.name.as_deref()).await?))
}
