use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::rows;
use super::{client_message, ClientMessage};
use crate::{EntityKind, ErrorCode, ProjectileSource, WirePoint};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CProjectileFired {
    pub projectile_id: String,
    /// Client id for player shots, npc id for NPC shots.
    pub shooter_id: String,
    pub source: ProjectileSource,
    pub position: WirePoint,
    pub velocity: WirePoint,
    pub projectile_type: String,
    pub target_id: Option<String>,
}
client_message!(CProjectileFired = "projectile_fired");

/// Hot channel: homing projectile position rows `[id, x, y, vx, vy]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CProjectileUpdates {
    pub p: Vec<ProjectileDelta>,
    pub t: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileDelta {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
}

impl ProjectileDelta {
    pub fn to_row(&self) -> Value {
        json!([self.id, self.x, self.y, self.velocity_x, self.velocity_y])
    }

    pub fn from_row(value: &Value) -> Result<Self, crate::ProtocolError> {
        const T: &str = CProjectileUpdates::MESSAGE_TYPE;
        let arr = rows::as_array(value, T)?;
        Ok(Self {
            id: rows::str_at(arr, 0, T)?.to_string(),
            x: rows::f64_at(arr, 1, T)?,
            y: rows::f64_at(arr, 2, T)?,
            velocity_x: rows::f64_at(arr, 3, T)?,
            velocity_y: rows::f64_at(arr, 4, T)?,
        })
    }
}

impl ClientMessage for CProjectileUpdates {
    const MESSAGE_TYPE: &'static str = "projectile_updates";

    fn payload(&self) -> Value {
        json!({
            "p": self.p.iter().map(ProjectileDelta::to_row).collect::<Vec<_>>(),
            "t": self.t,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CProjectileDestroyed {
    pub projectile_id: String,
    /// `hit`, `expired`, `orphaned`, `out_of_bounds` or `out_of_range`.
    pub reason: String,
}
client_message!(CProjectileDestroyed = "projectile_destroyed");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CEntityDamaged {
    pub entity_id: String,
    pub entity_type: EntityKind,
    pub damage: i64,
    pub new_health: i64,
    pub new_shield: i64,
}
client_message!(CEntityDamaged = "entity_damaged");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CEntityDestroyed {
    pub entity_id: String,
    pub entity_type: EntityKind,
    pub killer_id: Option<String>,
}
client_message!(CEntityDestroyed = "entity_destroyed");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CExplosionCreated {
    pub explosion_id: String,
    pub entity_id: String,
    pub entity_type: String,
    pub position: WirePoint,
    pub explosion_type: String,
}
client_message!(CExplosionCreated = "explosion_created");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CCombatUpdate {
    pub player_id: i64,
    pub client_id: u64,
    pub npc_id: Option<String>,
    pub is_attacking: bool,
    pub session_id: Option<String>,
    pub last_attack_time: u64,
}
client_message!(CCombatUpdate = "combat_update");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CCombatError {
    pub code: ErrorCode,
    pub message: String,
    pub active_session_id: Option<String>,
}
client_message!(CCombatError = "combat_error");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projectile_delta_round_trip() {
        let delta = ProjectileDelta {
            id: "proj_3".to_string(),
            x: 1.0,
            y: -2.0,
            velocity_x: 800.0,
            velocity_y: 0.0,
        };
        assert_eq!(ProjectileDelta::from_row(&delta.to_row()).unwrap(), delta);
    }

    #[test]
    fn combat_error_carries_code() {
        let raw = crate::codec::encode(&CCombatError {
            code: ErrorCode::MultipleCombatSessions,
            message: "combat already running".to_string(),
            active_session_id: Some("combat_1".to_string()),
        });
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["type"], "combat_error");
        assert_eq!(value["code"], "MULTIPLE_COMBAT_SESSIONS");
        assert_eq!(value["activeSessionId"], "combat_1");
    }
}
