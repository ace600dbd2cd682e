use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::client_message;
use crate::{WireInventory, WireItem, WireUpgrades};

/// Authoritative inventory/upgrade snapshot pushed after any economy
/// mutation (kill reward, skill upgrade, cargo pickup).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerStateUpdate {
    pub inventory: WireInventory,
    pub upgrades: WireUpgrades,
    pub items: Vec<WireItem>,
    pub resource_inventory: HashMap<String, i64>,
    pub recent_honor: f64,
    /// What triggered the update: `npc_reward`, `skill_upgrade`,
    /// `cargo_collect`, ...
    pub source: String,
    pub rewards_earned: Option<RewardsEarned>,
}
client_message!(CPlayerStateUpdate = "player_state_update");

/// The delta granted by one kill, echoed for client-side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsEarned {
    pub credits: i64,
    pub cosmos: i64,
    pub experience: i64,
    pub honor: i64,
    pub item: Option<String>,
    pub kill_op_id: String,
    pub npc_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerDataResponse {
    pub client_id: u64,
    pub player_db_id: i64,
    pub nickname: String,
    pub inventory: WireInventory,
    pub upgrades: WireUpgrades,
    pub items: Vec<WireItem>,
    pub resource_inventory: HashMap<String, i64>,
    pub rank: u32,
}
client_message!(CPlayerDataResponse = "player_data_response");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CSaveResponse {
    pub ok: bool,
    pub reason: Option<String>,
}
client_message!(CSaveResponse = "save_response");
