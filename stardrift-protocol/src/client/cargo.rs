use serde::{Deserialize, Serialize};

use super::client_message;
use crate::ErrorCode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CCargoBoxSpawned {
    pub box_id: String,
    pub x: f64,
    pub y: f64,
    pub resource_type: String,
    pub npc_type: String,
    /// Unix ms after which anyone may collect.
    pub exclusive_until: u64,
    pub expires_at: u64,
}
client_message!(CCargoBoxSpawned = "cargo_box_spawned");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CCargoBoxRemoved {
    pub box_id: String,
    /// `collected` or `expired`.
    pub reason: String,
}
client_message!(CCargoBoxRemoved = "cargo_box_removed");

/// Channelled-pickup progress for the collecting player only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CCargoBoxCollectStatus {
    pub box_id: String,
    /// `started`, `collected` or `cancelled`.
    pub status: String,
    pub reason: Option<ErrorCode>,
    pub resource_type: Option<String>,
    pub quantity: Option<i64>,
}
client_message!(CCargoBoxCollectStatus = "cargo_box_collect_status");

impl CCargoBoxCollectStatus {
    pub fn started(box_id: impl Into<String>) -> Self {
        Self {
            box_id: box_id.into(),
            status: "started".to_string(),
            reason: None,
            resource_type: None,
            quantity: None,
        }
    }

    pub fn collected(box_id: impl Into<String>, resource_type: String, quantity: i64) -> Self {
        Self {
            box_id: box_id.into(),
            status: "collected".to_string(),
            reason: None,
            resource_type: Some(resource_type),
            quantity: Some(quantity),
        }
    }

    pub fn cancelled(box_id: impl Into<String>, reason: ErrorCode) -> Self {
        Self {
            box_id: box_id.into(),
            status: "cancelled".to_string(),
            reason: Some(reason),
            resource_type: None,
            quantity: None,
        }
    }
}
