use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PickupId = i64;
pub type CourierId = i64;
pub type WasteTypeId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PickupStatus {
    Requested,
    Accepted,
    Cancelled,
    Completed,
    Finished,
}

impl PickupStatus {
    pub const ALL: [PickupStatus; 5] = [
        PickupStatus::Requested,
        PickupStatus::Accepted,
        PickupStatus::Cancelled,
        PickupStatus::Completed,
        PickupStatus::Finished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PickupStatus::Requested => "requested",
            PickupStatus::Accepted => "accepted",
            PickupStatus::Cancelled => "cancelled",
            PickupStatus::Completed => "completed",
            PickupStatus::Finished => "finished",
        }
    }

    /// Statuses reachable in one step. Terminal states return an empty slice.
    pub fn next_statuses(&self) -> &'static [PickupStatus] {
        match self {
            PickupStatus::Requested => &[PickupStatus::Accepted, PickupStatus::Cancelled],
            PickupStatus::Accepted => &[PickupStatus::Completed, PickupStatus::Cancelled],
            PickupStatus::Completed => &[PickupStatus::Finished],
            PickupStatus::Cancelled | PickupStatus::Finished => &[],
        }
    }

    pub fn can_transition_to(&self, target: PickupStatus) -> bool {
        self.next_statuses().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_statuses().is_empty()
    }
}

impl fmt::Display for PickupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown pickup status '{}'", self.0)
    }
}

impl FromStr for PickupStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        PickupStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(raw.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteLine {
    pub waste_type_id: WasteTypeId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickupRequest {
    pub id: PickupId,
    pub address: String,
    pub requested_at: DateTime<Utc>,
    pub status: PickupStatus,
    pub courier_id: Option<CourierId>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub waste_details: Vec<WasteLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changes written by a single status transition.
///
/// The repository applies it only while the stored status still equals
/// `expected_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct PickupPatch {
    pub expected_status: PickupStatus,
    pub status: PickupStatus,
    pub courier_id: Option<CourierId>,
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PickupPatch {
    pub fn apply_to(&self, pickup: &mut PickupRequest) {
        pickup.status = self.status;
        if let Some(courier_id) = self.courier_id {
            pickup.courier_id = Some(courier_id);
        }
        pickup.reason = self.reason.clone();
        pickup.updated_at = self.updated_at;
    }
}
