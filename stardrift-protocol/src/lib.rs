pub mod client;
pub mod codec;
mod error;
pub mod ident;
pub mod server;

use serde::{Deserialize, Serialize};

pub use error::{ErrorCode, ProtocolError};

/// A 2D point as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: f64,
    pub y: f64,
}

/// Position plus facing, used in join payloads and spawn broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WirePose {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
}

/// The entity kind attached to damage and destruction broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Player,
    Npc,
}

/// Who launched a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectileSource {
    Player,
    Pet,
    Npc,
}

/// Currency wallet as serialized in `player_state_update` and data
/// responses. All values are non-negative integers by the time they
/// reach the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInventory {
    pub credits: i64,
    pub cosmos: i64,
    pub experience: i64,
    pub honor: i64,
    pub skill_points: i64,
    pub skill_points_total: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireUpgrades {
    pub hp: u32,
    pub shield: u32,
    pub speed: u32,
    pub damage: u32,
}

/// An owned item instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireItem {
    pub id: String,
    pub instance_id: String,
    pub acquired_at: u64,
    pub slot: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireShipSkins {
    pub selected_skin_id: Option<String>,
    pub unlocked_skin_ids: Vec<String>,
}
