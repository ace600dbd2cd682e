//! Serverbound messages. One struct per frame type, tagged by the
//! required `type` discriminator on [`Serverbound`].

use serde::Deserialize;
use serde_json::Value;

use crate::{WirePoint, WirePose};

/// Every frame a client may send. Unknown tags never reach this enum;
/// the codec rejects them first so they can be counted and dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Serverbound {
    #[serde(rename = "join")]
    Join(SJoin),
    #[serde(rename = "position_update")]
    PositionUpdate(SPositionUpdate),
    #[serde(rename = "heartbeat")]
    Heartbeat(SHeartbeat),
    #[serde(rename = "projectile_fired")]
    ProjectileFired(SProjectileFired),
    #[serde(rename = "start_combat")]
    StartCombat(SStartCombat),
    #[serde(rename = "stop_combat")]
    StopCombat(SStopCombat),
    #[serde(rename = "skill_upgrade_request")]
    SkillUpgradeRequest(SSkillUpgradeRequest),
    #[serde(rename = "explosion_created")]
    ExplosionCreated(SExplosionCreated),
    #[serde(rename = "chat_message")]
    ChatMessage(SChatMessage),
    #[serde(rename = "cargo_box_collect")]
    CargoBoxCollect(SCargoBoxCollect),
    #[serde(rename = "request_player_data")]
    RequestPlayerData(SRequestPlayerData),
    #[serde(rename = "save_request")]
    SaveRequest(SSaveRequest),
    #[serde(rename = "respawn_request")]
    RespawnRequest(SRespawnRequest),
}

impl Serverbound {
    /// Wire tags the codec accepts. Anything else is an unknown type.
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "join",
        "position_update",
        "heartbeat",
        "projectile_fired",
        "start_combat",
        "stop_combat",
        "skill_upgrade_request",
        "explosion_created",
        "chat_message",
        "cargo_box_collect",
        "request_player_data",
        "save_request",
        "respawn_request",
    ];

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::PositionUpdate(_) => "position_update",
            Self::Heartbeat(_) => "heartbeat",
            Self::ProjectileFired(_) => "projectile_fired",
            Self::StartCombat(_) => "start_combat",
            Self::StopCombat(_) => "stop_combat",
            Self::SkillUpgradeRequest(_) => "skill_upgrade_request",
            Self::ExplosionCreated(_) => "explosion_created",
            Self::ChatMessage(_) => "chat_message",
            Self::CargoBoxCollect(_) => "cargo_box_collect",
            Self::RequestPlayerData(_) => "request_player_data",
            Self::SaveRequest(_) => "save_request",
            Self::RespawnRequest(_) => "respawn_request",
        }
    }
}

/// First frame of a connection. `clientId` is accepted for backwards
/// compatibility but the server-assigned id is authoritative.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SJoin {
    #[serde(default)]
    pub client_id: Option<u64>,
    pub nickname: String,
    pub auth_token: String,
    pub user_id: String,
    #[serde(default)]
    pub position: Option<WirePose>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SPositionUpdate {
    pub client_id: u64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub velocity_x: f64,
    #[serde(default)]
    pub velocity_y: f64,
    #[serde(default)]
    pub tick: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SHeartbeat {
    pub client_id: u64,
    #[serde(default)]
    pub timestamp: u64,
}

/// Client-side shot notification. The server recomputes damage and
/// ownership; the client payload is positional only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SProjectileFired {
    pub client_id: u64,
    pub projectile_id: String,
    /// Numeric db id or UUID string; see [`crate::ident`].
    pub player_id: Value,
    pub position: WirePoint,
    pub velocity: WirePoint,
    pub projectile_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SStartCombat {
    pub client_id: u64,
    pub player_id: Value,
    pub npc_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SStopCombat {
    pub client_id: u64,
    pub player_id: Value,
    #[serde(default)]
    pub npc_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeType {
    Hp,
    Shield,
    Speed,
    Damage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SSkillUpgradeRequest {
    pub client_id: u64,
    pub player_id: Value,
    pub upgrade_type: UpgradeType,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SExplosionCreated {
    pub client_id: u64,
    pub explosion_id: String,
    pub entity_id: Value,
    pub entity_type: String,
    pub position: WirePoint,
    pub explosion_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SChatMessage {
    pub client_id: u64,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SCargoBoxCollect {
    pub client_id: u64,
    pub box_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SRequestPlayerData {
    pub client_id: u64,
    pub player_id: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SSaveRequest {
    #[serde(default)]
    pub client_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SRespawnRequest {
    pub client_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_covers_every_variant() {
        // Deserializing each known tag with minimal fields must at
        // least reach field validation, never "unknown variant".
        for tag in Serverbound::KNOWN_TYPES {
            let raw = format!("{{\"type\":\"{tag}\"}}");
            if let Err(err) = serde_json::from_str::<Serverbound>(&raw) {
                let msg = err.to_string();
                assert!(
                    !msg.contains("unknown variant"),
                    "tag {tag} not wired into Serverbound: {msg}"
                );
            }
        }
    }

    #[test]
    fn position_update_parses_camel_case() {
        let raw = r#"{"type":"position_update","clientId":7,"x":120.0,"y":0.0,
                      "rotation":0.5,"velocityX":300.0,"velocityY":0.0,"tick":5}"#;
        let msg: Serverbound = serde_json::from_str(raw).unwrap();
        match msg {
            Serverbound::PositionUpdate(update) => {
                assert_eq!(update.client_id, 7);
                assert_eq!(update.velocity_x, 300.0);
                assert_eq!(update.tick, 5);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn start_combat_accepts_numeric_and_uuid_player_ids() {
        let raw = r#"{"type":"start_combat","clientId":1,"playerId":42,"npcId":"npc_3"}"#;
        assert!(serde_json::from_str::<Serverbound>(raw).is_ok());
        let raw = r#"{"type":"start_combat","clientId":1,
                      "playerId":"7c0e2e9e-5dd8-4d63-a7bd-001020304050","npcId":"npc_3"}"#;
        assert!(serde_json::from_str::<Serverbound>(raw).is_ok());
    }
}
