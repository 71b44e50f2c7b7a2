use crate::engine::query::{build_waste_query, WasteListParams, WasteQuery};
use crate::error::AppError;
use crate::models::dropbox::Dropbox;
use crate::models::page::{Page, Pagination};
use crate::models::pickup::WasteTypeId;
use crate::models::waste::{WasteItem, WasteItemWithType, WasteType};
use crate::state::AppState;

pub type WastePage = Page<WasteItem>;

pub async fn list_waste_types(state: &AppState) -> Result<Vec<WasteType>, AppError> {
    let mut waste_types = state.waste_types.list().await?;
    waste_types.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(waste_types)
}

/// Paged waste catalog, optionally narrowed by a name search.
pub async fn list_wastes(state: &AppState, params: &WasteListParams) -> Result<WastePage, AppError> {
    let query = build_waste_query(params, &state.query_settings)?;
    let (items, total) = futures::try_join!(
        state.wastes.find_wastes(&query),
        state.wastes.count_wastes(&query.filter),
    )?;

    Ok(WastePage {
        items,
        pagination: Pagination::new(total, query.page, query.limit),
    })
}

/// Every waste item of one type, each carrying its type. An empty result is `NotFound`.
pub async fn wastes_by_type(
    state: &AppState,
    waste_type_id: WasteTypeId,
) -> Result<Vec<WasteItemWithType>, AppError> {
    let ids = [waste_type_id];
    let (wastes, waste_types) = futures::try_join!(
        state.wastes.find_wastes_by_type(waste_type_id),
        state.waste_types.find_by_ids(&ids),
    )?;

    if wastes.is_empty() {
        return Err(AppError::NotFound(format!(
            "no waste found for waste type {waste_type_id}"
        )));
    }

    let waste_type = waste_types.into_iter().next();
    Ok(wastes
        .into_iter()
        .map(|item| WasteItemWithType {
            item,
            waste_type: waste_type.clone(),
        })
        .collect())
}

/// Name lookup capped at [`crate::engine::query::NAME_MATCH_LIMIT`] rows.
pub async fn find_wastes_by_name(
    state: &AppState,
    name: Option<&str>,
) -> Result<Vec<WasteItem>, AppError> {
    let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
        return Err(AppError::InvalidSearchQuery("name is required".to_string()));
    };

    let wastes = state.wastes.find_wastes(&WasteQuery::by_name(name)).await?;
    if wastes.is_empty() {
        return Err(AppError::NotFound(format!("no waste named like '{name}'")));
    }
    Ok(wastes)
}

pub async fn list_dropboxes(state: &AppState) -> Result<Vec<Dropbox>, AppError> {
    Ok(state.dropboxes.list_dropboxes().await?)
}
