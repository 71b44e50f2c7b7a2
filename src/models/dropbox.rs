use serde::{Deserialize, Serialize};

pub type DropboxId = i64;

/// A fixed drop-off point. Read-only from this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dropbox {
    pub id: DropboxId,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}
