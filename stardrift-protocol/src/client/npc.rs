use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::rows;
use super::{client_message, ClientMessage};
use crate::ProtocolError;

/// Full NPC replication tuple; compact row
/// `[id, type, x, y, rot, hp, maxHp, sh, maxSh, behavior[0]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcState {
    pub id: String,
    pub npc_type: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub health: i64,
    pub max_health: i64,
    pub shield: i64,
    pub max_shield: i64,
    /// First letter of the behavior name: `c`, `a` or `f`.
    pub behavior: char,
}

impl NpcState {
    pub fn to_row(&self) -> Value {
        json!([
            self.id,
            self.npc_type,
            self.x,
            self.y,
            self.rotation,
            self.health,
            self.max_health,
            self.shield,
            self.max_shield,
            self.behavior.to_string(),
        ])
    }

    fn from_row(value: &Value, message_type: &str) -> Result<Self, ProtocolError> {
        let arr = rows::as_array(value, message_type)?;
        Ok(Self {
            id: rows::str_at(arr, 0, message_type)?.to_string(),
            npc_type: rows::str_at(arr, 1, message_type)?.to_string(),
            x: rows::f64_at(arr, 2, message_type)?,
            y: rows::f64_at(arr, 3, message_type)?,
            rotation: rows::f64_at(arr, 4, message_type)?,
            health: rows::i64_at(arr, 5, message_type)?,
            max_health: rows::i64_at(arr, 6, message_type)?,
            shield: rows::i64_at(arr, 7, message_type)?,
            max_shield: rows::i64_at(arr, 8, message_type)?,
            behavior: rows::str_at(arr, 9, message_type)?
                .chars()
                .next()
                .unwrap_or('c'),
        })
    }
}

/// Snapshot of every NPC on the map, sent right after `welcome`.
#[derive(Debug, Clone, PartialEq)]
pub struct CInitialNpcs {
    pub n: Vec<NpcState>,
    pub t: u64,
}

impl ClientMessage for CInitialNpcs {
    const MESSAGE_TYPE: &'static str = "initial_npcs";

    fn payload(&self) -> Value {
        json!({
            "n": self.n.iter().map(NpcState::to_row).collect::<Vec<_>>(),
            "t": self.t,
        })
    }
}

impl CInitialNpcs {
    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        let rows = value
            .get("n")
            .and_then(Value::as_array)
            .ok_or_else(|| ProtocolError::Invalid {
                message_type: Self::MESSAGE_TYPE.to_string(),
                reason: "missing n".to_string(),
            })?;
        let n = rows
            .iter()
            .map(|row| NpcState::from_row(row, Self::MESSAGE_TYPE))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            n,
            t: value.get("t").and_then(Value::as_u64).unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CNpcSpawn {
    pub npc: NpcState,
    pub t: u64,
}
client_message!(CNpcSpawn = "npc_spawn");

/// Hot channel: per-tick movement rows
/// `[id, x, y, rot, hp, sh, behavior[0]]` for NPCs that moved.
#[derive(Debug, Clone, PartialEq)]
pub struct CNpcBulkUpdate {
    pub n: Vec<NpcDelta>,
    pub t: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NpcDelta {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub health: i64,
    pub shield: i64,
    pub behavior: char,
}

impl NpcDelta {
    pub fn to_row(&self) -> Value {
        json!([
            self.id,
            self.x,
            self.y,
            self.rotation,
            self.health,
            self.shield,
            self.behavior.to_string(),
        ])
    }

    pub fn from_row(value: &Value) -> Result<Self, ProtocolError> {
        const T: &str = CNpcBulkUpdate::MESSAGE_TYPE;
        let arr = rows::as_array(value, T)?;
        Ok(Self {
            id: rows::str_at(arr, 0, T)?.to_string(),
            x: rows::f64_at(arr, 1, T)?,
            y: rows::f64_at(arr, 2, T)?,
            rotation: rows::f64_at(arr, 3, T)?,
            health: rows::i64_at(arr, 4, T)?,
            shield: rows::i64_at(arr, 5, T)?,
            behavior: rows::str_at(arr, 6, T)?.chars().next().unwrap_or('c'),
        })
    }
}

impl ClientMessage for CNpcBulkUpdate {
    const MESSAGE_TYPE: &'static str = "npc_bulk_update";

    fn payload(&self) -> Value {
        json!({
            "n": self.n.iter().map(NpcDelta::to_row).collect::<Vec<_>>(),
            "t": self.t,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CNpcLeft {
    pub npc_id: String,
}
client_message!(CNpcLeft = "npc_left");

#[cfg(test)]
mod tests {
    use super::*;

    fn scouter() -> NpcState {
        NpcState {
            id: "npc_7".to_string(),
            npc_type: "Scouter".to_string(),
            x: -512.0,
            y: 90.5,
            rotation: 0.25,
            health: 8_000,
            max_health: 8_000,
            shield: 2_100,
            max_shield: 4_000,
            behavior: 'a',
        }
    }

    #[test]
    fn initial_npcs_round_trip() {
        let msg = CInitialNpcs {
            n: vec![scouter()],
            t: 99,
        };
        let raw = crate::codec::encode(&msg);
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["type"], "initial_npcs");
        assert_eq!(CInitialNpcs::decode(&value).unwrap(), msg);
    }

    #[test]
    fn bulk_delta_round_trip() {
        let delta = NpcDelta {
            id: "npc_1".to_string(),
            x: 10.0,
            y: 20.0,
            rotation: 3.0,
            health: 700,
            shield: 0,
            behavior: 'f',
        };
        assert_eq!(NpcDelta::from_row(&delta.to_row()).unwrap(), delta);
    }
}
