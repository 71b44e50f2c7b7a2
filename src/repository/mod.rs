//! Data-access collaborators consumed by the pickup engine.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::engine::query::{PickupFilter, PickupQuery, WasteFilter, WasteQuery};
use crate::error::RepositoryError;
use crate::models::dropbox::Dropbox;
use crate::models::pickup::{CourierId, PickupId, PickupPatch, PickupRequest, WasteTypeId};
use crate::models::waste::{WasteItem, WasteType};

pub use memory::InMemoryStore;

#[async_trait]
pub trait PickupRepository: Send + Sync {
    async fn find_by_id(&self, id: PickupId) -> Result<Option<PickupRequest>, RepositoryError>;

    /// One page of pickups matching `query`, ordered by its sort.
    async fn find_many(&self, query: &PickupQuery) -> Result<Vec<PickupRequest>, RepositoryError>;

    async fn count(&self, filter: &PickupFilter) -> Result<u64, RepositoryError>;

    /// Applies `patch` atomically, failing with [`RepositoryError::StatusConflict`]
    /// when the stored status no longer equals `patch.expected_status`.
    async fn update(&self, id: PickupId, patch: PickupPatch) -> Result<PickupRequest, RepositoryError>;
}

#[async_trait]
pub trait CourierPointsRepository: Send + Sync {
    /// Latest balance snapshot recorded strictly before `before`, if any.
    async fn balance(
        &self,
        courier_id: CourierId,
        before: DateTime<Utc>,
    ) -> Result<Option<i64>, RepositoryError>;
}

#[async_trait]
pub trait WasteTypeRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<WasteType>, RepositoryError>;

    async fn find_by_ids(&self, ids: &[WasteTypeId]) -> Result<Vec<WasteType>, RepositoryError>;
}

#[async_trait]
pub trait WasteRepository: Send + Sync {
    /// One page of waste items matching `query`, ordered by name.
    async fn find_wastes(&self, query: &WasteQuery) -> Result<Vec<WasteItem>, RepositoryError>;

    async fn count_wastes(&self, filter: &WasteFilter) -> Result<u64, RepositoryError>;

    /// Every waste item of one type, ordered by name.
    async fn find_wastes_by_type(
        &self,
        waste_type_id: WasteTypeId,
    ) -> Result<Vec<WasteItem>, RepositoryError>;
}

#[async_trait]
pub trait DropboxRepository: Send + Sync {
    async fn list_dropboxes(&self) -> Result<Vec<Dropbox>, RepositoryError>;
}
