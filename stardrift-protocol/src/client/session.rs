use serde::{Deserialize, Serialize};

use super::client_message;
use crate::{ErrorCode, WirePose, WireShipSkins};

/// Sent once after a successful join handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CWelcome {
    pub client_id: u64,
    /// Issuer UUID, the auth identity.
    pub player_id: String,
    /// Stable database row id, the display identity.
    pub player_db_id: i64,
    pub map_id: String,
    pub message: String,
    pub initial_state: InitialState,
}
client_message!(CWelcome = "welcome");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialState {
    pub position: WirePose,
    pub health: i64,
    pub max_health: i64,
    pub shield: i64,
    pub max_shield: i64,
    pub is_administrator: bool,
    pub rank: u32,
    pub leaderboard_podium_rank: u32,
    pub ship_skins: WireShipSkins,
    pub recent_honor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerJoined {
    pub client_id: u64,
    pub nickname: String,
    pub position: WirePose,
    pub health: i64,
    pub max_health: i64,
    pub shield: i64,
    pub max_shield: i64,
    pub rank: u32,
}
client_message!(CPlayerJoined = "player_joined");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerLeft {
    pub client_id: u64,
}
client_message!(CPlayerLeft = "player_left");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CHeartbeatAck {
    /// Echo of the client timestamp.
    pub timestamp: u64,
    /// Server wall clock, unix ms.
    pub t: u64,
}
client_message!(CHeartbeatAck = "heartbeat_ack");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CChatMessage {
    pub client_id: u64,
    pub nickname: String,
    pub content: String,
    pub t: u64,
}
client_message!(CChatMessage = "chat_message");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CPlayerRespawned {
    pub client_id: u64,
    pub position: WirePose,
    pub health: i64,
    pub shield: i64,
}
client_message!(CPlayerRespawned = "player_respawned");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CError {
    pub code: ErrorCode,
    pub message: String,
}
client_message!(CError = "error");

impl CError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
