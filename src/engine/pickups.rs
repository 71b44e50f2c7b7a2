use std::collections::HashMap;

use serde::Serialize;

use crate::engine::query::{build_query, ListParams, PickupQuery};
use crate::error::AppError;
use crate::models::page::{Page, Pagination};
use crate::models::pickup::{CourierId, PickupId, PickupRequest, WasteTypeId};
use crate::models::waste::WasteLineDetail;
use crate::state::AppState;

pub type PickupPage = Page<PickupRequest>;

#[derive(Debug, Clone, Serialize)]
pub struct PickupDetail {
    #[serde(flatten)]
    pub pickup: PickupRequest,
    pub waste_lines: Vec<WasteLineDetail>,
}

pub async fn list_pickups(state: &AppState, params: &ListParams) -> Result<PickupPage, AppError> {
    let query = build_query(params, &state.query_settings)?;
    fetch_page(state, &query).await
}

/// Same contract as [`list_pickups`], pinned to one courier.
pub async fn pickup_history(
    state: &AppState,
    courier_id: CourierId,
    params: &ListParams,
) -> Result<PickupPage, AppError> {
    let mut query = build_query(params, &state.query_settings)?;
    query.filter.courier_id = Some(courier_id);
    fetch_page(state, &query).await
}

async fn fetch_page(state: &AppState, query: &PickupQuery) -> Result<PickupPage, AppError> {
    let (items, total) = futures::try_join!(
        state.pickups.find_many(query),
        state.pickups.count(&query.filter),
    )?;

    Ok(PickupPage {
        items,
        pagination: Pagination::new(total, query.page, query.limit),
    })
}

pub async fn get_pickup(state: &AppState, id: PickupId) -> Result<PickupDetail, AppError> {
    let pickup = state
        .pickups
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pickup {id} not found")))?;

    let mut ids: Vec<WasteTypeId> = pickup
        .waste_details
        .iter()
        .map(|line| line.waste_type_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let names: HashMap<WasteTypeId, String> = if ids.is_empty() {
        HashMap::new()
    } else {
        state
            .waste_types
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|waste_type| (waste_type.id, waste_type.name))
            .collect()
    };

    let waste_lines = pickup
        .waste_details
        .iter()
        .map(|line| WasteLineDetail {
            waste_type_id: line.waste_type_id,
            waste_type_name: names.get(&line.waste_type_id).cloned(),
            quantity: line.quantity,
        })
        .collect();

    Ok(PickupDetail {
        pickup,
        waste_lines,
    })
}
