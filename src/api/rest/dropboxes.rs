use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::engine::catalog::list_dropboxes;
use crate::error::AppError;
use crate::models::dropbox::Dropbox;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/dropboxes", get(list))
}

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Dropbox>>, AppError> {
    Ok(Json(list_dropboxes(&state).await?))
}
