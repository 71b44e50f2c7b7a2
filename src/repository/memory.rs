use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;

use crate::engine::query::{PickupFilter, PickupQuery, WasteFilter, WasteQuery};
use crate::error::RepositoryError;
use crate::models::dropbox::{Dropbox, DropboxId};
use crate::models::pickup::{CourierId, PickupId, PickupPatch, PickupRequest, WasteTypeId};
use crate::models::waste::{WasteId, WasteItem, WasteType};
use crate::repository::{
    CourierPointsRepository, DropboxRepository, PickupRepository, WasteRepository,
    WasteTypeRepository,
};

#[derive(Debug, Clone, Deserialize)]
pub struct PointRecord {
    pub courier_id: CourierId,
    pub recorded_at: DateTime<Utc>,
    pub balance: i64,
}

/// Initial contents for an [`InMemoryStore`], usually read from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub pickups: Vec<PickupRequest>,
    #[serde(default)]
    pub waste_types: Vec<WasteType>,
    #[serde(default)]
    pub points: Vec<PointRecord>,
    #[serde(default)]
    pub wastes: Vec<WasteItem>,
    #[serde(default)]
    pub dropboxes: Vec<Dropbox>,
}

#[derive(Debug, Clone, Copy)]
struct PointSnapshot {
    recorded_at: DateTime<Utc>,
    balance: i64,
}

#[derive(Default)]
pub struct InMemoryStore {
    pickups: DashMap<PickupId, PickupRequest>,
    waste_types: DashMap<WasteTypeId, WasteType>,
    points: DashMap<CourierId, Vec<PointSnapshot>>,
    wastes: DashMap<WasteId, WasteItem>,
    dropboxes: DashMap<DropboxId, Dropbox>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: StoreSeed) -> Self {
        let store = Self::new();
        for pickup in seed.pickups {
            store.insert_pickup(pickup);
        }
        for waste_type in seed.waste_types {
            store.insert_waste_type(waste_type);
        }
        for record in seed.points {
            store.record_points(record.courier_id, record.recorded_at, record.balance);
        }
        for waste in seed.wastes {
            store.insert_waste(waste);
        }
        for dropbox in seed.dropboxes {
            store.insert_dropbox(dropbox);
        }
        store
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let seed: StoreSeed = serde_json::from_str(raw)?;
        Ok(Self::from_seed(seed))
    }

    pub fn insert_pickup(&self, pickup: PickupRequest) {
        self.pickups.insert(pickup.id, pickup);
    }

    pub fn insert_waste_type(&self, waste_type: WasteType) {
        self.waste_types.insert(waste_type.id, waste_type);
    }

    pub fn insert_waste(&self, waste: WasteItem) {
        self.wastes.insert(waste.id, waste);
    }

    pub fn insert_dropbox(&self, dropbox: Dropbox) {
        self.dropboxes.insert(dropbox.id, dropbox);
    }

    pub fn record_points(&self, courier_id: CourierId, recorded_at: DateTime<Utc>, balance: i64) {
        let mut snapshots = self.points.entry(courier_id).or_default();
        snapshots.push(PointSnapshot {
            recorded_at,
            balance,
        });
        snapshots.sort_by_key(|snapshot| snapshot.recorded_at);
    }

    pub fn pickup_count(&self) -> usize {
        self.pickups.len()
    }
}

#[async_trait]
impl PickupRepository for InMemoryStore {
    async fn find_by_id(&self, id: PickupId) -> Result<Option<PickupRequest>, RepositoryError> {
        Ok(self.pickups.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_many(&self, query: &PickupQuery) -> Result<Vec<PickupRequest>, RepositoryError> {
        let mut matching: Vec<PickupRequest> = self
            .pickups
            .iter()
            .filter(|entry| query.filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let skip = usize::try_from(query.skip()).unwrap_or(usize::MAX);
        let take = usize::try_from(query.take()).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(skip).take(take).collect())
    }

    async fn count(&self, filter: &PickupFilter) -> Result<u64, RepositoryError> {
        let total = self
            .pickups
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count();
        Ok(total as u64)
    }

    async fn update(&self, id: PickupId, patch: PickupPatch) -> Result<PickupRequest, RepositoryError> {
        let mut pickup = self
            .pickups
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;

        if pickup.status != patch.expected_status {
            return Err(RepositoryError::StatusConflict {
                id,
                expected: patch.expected_status,
                actual: pickup.status,
                target: patch.status,
            });
        }

        patch.apply_to(&mut pickup);
        Ok(pickup.clone())
    }
}

#[async_trait]
impl CourierPointsRepository for InMemoryStore {
    async fn balance(
        &self,
        courier_id: CourierId,
        before: DateTime<Utc>,
    ) -> Result<Option<i64>, RepositoryError> {
        let balance = self.points.get(&courier_id).and_then(|snapshots| {
            snapshots
                .iter()
                .rev()
                .find(|snapshot| snapshot.recorded_at < before)
                .map(|snapshot| snapshot.balance)
        });
        Ok(balance)
    }
}

#[async_trait]
impl WasteTypeRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<WasteType>, RepositoryError> {
        Ok(self
            .waste_types
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_by_ids(&self, ids: &[WasteTypeId]) -> Result<Vec<WasteType>, RepositoryError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.waste_types.get(id).map(|entry| entry.value().clone()))
            .collect())
    }
}

#[async_trait]
impl WasteRepository for InMemoryStore {
    async fn find_wastes(&self, query: &WasteQuery) -> Result<Vec<WasteItem>, RepositoryError> {
        let mut matching: Vec<WasteItem> = self
            .wastes
            .iter()
            .filter(|entry| query.filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(WasteQuery::compare);

        let skip = usize::try_from(query.skip()).unwrap_or(usize::MAX);
        let take = usize::try_from(query.take()).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(skip).take(take).collect())
    }

    async fn count_wastes(&self, filter: &WasteFilter) -> Result<u64, RepositoryError> {
        let total = self
            .wastes
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count();
        Ok(total as u64)
    }

    async fn find_wastes_by_type(
        &self,
        waste_type_id: WasteTypeId,
    ) -> Result<Vec<WasteItem>, RepositoryError> {
        let mut wastes: Vec<WasteItem> = self
            .wastes
            .iter()
            .filter(|entry| entry.waste_type_id == waste_type_id)
            .map(|entry| entry.value().clone())
            .collect();
        wastes.sort_by(WasteQuery::compare);
        Ok(wastes)
    }
}

#[async_trait]
impl DropboxRepository for InMemoryStore {
    async fn list_dropboxes(&self) -> Result<Vec<Dropbox>, RepositoryError> {
        let mut dropboxes: Vec<Dropbox> = self
            .dropboxes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        dropboxes.sort_by_key(|dropbox| dropbox.id);
        Ok(dropboxes)
    }
}
