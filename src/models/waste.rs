use serde::{Deserialize, Serialize};

use crate::models::pickup::WasteTypeId;

pub type WasteId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteType {
    pub id: WasteTypeId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A catalog entry for a concrete kind of waste, grouped under a [`WasteType`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteItem {
    pub id: WasteId,
    pub name: String,
    pub waste_type_id: WasteTypeId,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WasteItemWithType {
    #[serde(flatten)]
    pub item: WasteItem,
    pub waste_type: Option<WasteType>,
}

/// A waste line of a pickup resolved against the waste-type catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteLineDetail {
    pub waste_type_id: WasteTypeId,
    pub waste_type_name: Option<String>,
    pub quantity: u32,
}
