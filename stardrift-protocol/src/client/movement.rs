use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::rows;
use super::{client_message, ClientMessage};
use crate::ProtocolError;

/// One remote player's replicated tuple. The verbose serde form exists
/// for tooling; the hot channel ships the compact row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePlayerState {
    pub client_id: u64,
    pub x: f64,
    pub y: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub rotation: f64,
    pub tick: u64,
    pub nickname: String,
    pub rank: u32,
    pub health: i64,
    pub max_health: i64,
    pub shield: i64,
    pub max_shield: i64,
    pub podium: u32,
    pub ship_skin_id: Option<String>,
}

impl RemotePlayerState {
    /// Compact row: `[clientId, x, y, vx, vy, rotation, tick, nickname,
    /// rank, hp, maxHp, sh, maxSh, podium, shipSkinId]`.
    pub fn to_row(&self) -> Value {
        json!([
            self.client_id,
            self.x,
            self.y,
            self.velocity_x,
            self.velocity_y,
            self.rotation,
            self.tick,
            self.nickname,
            self.rank,
            self.health,
            self.max_health,
            self.shield,
            self.max_shield,
            self.podium,
            self.ship_skin_id,
        ])
    }

    pub fn from_row(value: &Value) -> Result<Self, ProtocolError> {
        const T: &str = CRemotePlayerUpdate::MESSAGE_TYPE;
        let arr = rows::as_array(value, T)?;
        Ok(Self {
            client_id: rows::u64_at(arr, 0, T)?,
            x: rows::f64_at(arr, 1, T)?,
            y: rows::f64_at(arr, 2, T)?,
            velocity_x: rows::f64_at(arr, 3, T)?,
            velocity_y: rows::f64_at(arr, 4, T)?,
            rotation: rows::f64_at(arr, 5, T)?,
            tick: rows::u64_at(arr, 6, T)?,
            nickname: rows::str_at(arr, 7, T)?.to_string(),
            rank: rows::u64_at(arr, 8, T)? as u32,
            health: rows::i64_at(arr, 9, T)?,
            max_health: rows::i64_at(arr, 10, T)?,
            shield: rows::i64_at(arr, 11, T)?,
            max_shield: rows::i64_at(arr, 12, T)?,
            podium: rows::u64_at(arr, 13, T)? as u32,
            ship_skin_id: arr.get(14).and_then(Value::as_str).map(str::to_string),
        })
    }
}

/// Hot channel: a single player's movement/vitals delta.
#[derive(Debug, Clone, PartialEq)]
pub struct CRemotePlayerUpdate {
    pub p: RemotePlayerState,
    /// Server wall clock, unix ms.
    pub t: u64,
}

impl ClientMessage for CRemotePlayerUpdate {
    const MESSAGE_TYPE: &'static str = "remote_player_update";

    fn payload(&self) -> Value {
        json!({ "p": self.p.to_row(), "t": self.t })
    }
}

impl CRemotePlayerUpdate {
    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        let p = value.get("p").ok_or_else(|| ProtocolError::Invalid {
            message_type: Self::MESSAGE_TYPE.to_string(),
            reason: "missing p".to_string(),
        })?;
        let t = value.get("t").and_then(Value::as_u64).unwrap_or(0);
        Ok(Self {
            p: RemotePlayerState::from_row(p)?,
            t,
        })
    }
}

/// Correction sent when a position input was rejected; carries the
/// authoritative pose the client must snap back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CPositionAck {
    pub tick: u64,
    pub x: f64,
    pub y: f64,
    pub accepted: bool,
}
client_message!(CPositionAck = "position_ack");
