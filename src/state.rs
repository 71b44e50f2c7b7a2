use std::sync::Arc;

use crate::clock::Clock;
use crate::engine::query::QuerySettings;
use crate::observability::metrics::Metrics;
use crate::repository::{
    CourierPointsRepository, DropboxRepository, InMemoryStore, PickupRepository, WasteRepository,
    WasteTypeRepository,
};

pub struct AppState {
    pub pickups: Arc<dyn PickupRepository>,
    pub points: Arc<dyn CourierPointsRepository>,
    pub waste_types: Arc<dyn WasteTypeRepository>,
    pub wastes: Arc<dyn WasteRepository>,
    pub dropboxes: Arc<dyn DropboxRepository>,
    pub clock: Arc<dyn Clock>,
    pub query_settings: QuerySettings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        pickups: Arc<dyn PickupRepository>,
        points: Arc<dyn CourierPointsRepository>,
        waste_types: Arc<dyn WasteTypeRepository>,
        wastes: Arc<dyn WasteRepository>,
        dropboxes: Arc<dyn DropboxRepository>,
        clock: Arc<dyn Clock>,
        query_settings: QuerySettings,
    ) -> Self {
        Self {
            pickups,
            points,
            waste_types,
            wastes,
            dropboxes,
            clock,
            query_settings,
            metrics: Metrics::new(),
        }
    }

    /// State whose repositories are all backed by `store`.
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        clock: Arc<dyn Clock>,
        query_settings: QuerySettings,
    ) -> Self {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            clock,
            query_settings,
        )
    }
}
