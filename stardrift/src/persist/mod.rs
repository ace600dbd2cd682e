//! Persistence port. The tick loop never awaits the store; it
//! enqueues save requests on a bounded queue drained by a worker.

pub mod memory;
pub mod queue;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::player::{OwnedItem, Upgrades, Wallet};
use stardrift_protocol::WireShipSkins;

pub use memory::MemoryPlayerStore;
pub use queue::{SaveQueue, SaveRequest};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transient store failure: {0}")]
    Transient(String),
    #[error("row not found")]
    NotFound,
    #[error("stored row is corrupt: {0}")]
    Corrupt(String),
}

/// Everything the server persists about a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRow {
    pub db_id: i64,
    pub user_id: Uuid,
    pub nickname: String,
    pub ship: String,
    pub map_id: Option<String>,
    pub upgrades: Upgrades,
    pub wallet: Wallet,
    pub resources: HashMap<String, i64>,
    pub items: Vec<OwnedItem>,
    pub ship_skins: WireShipSkins,
    pub is_administrator: bool,
}

#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Load the row for `user_id`, creating a fresh one on first login.
    async fn load(&self, user_id: Uuid, nickname: &str) -> Result<PlayerRow, StoreError>;

    async fn save(&self, row: PlayerRow, reason: &str) -> Result<(), StoreError>;

    async fn save_honor_snapshot(
        &self,
        user_id: Uuid,
        honor: i64,
        source: &str,
    ) -> Result<(), StoreError>;

    async fn recent_honor_average(&self, user_id: Uuid, days: u32) -> Result<f64, StoreError>;
}
