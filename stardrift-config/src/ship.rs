use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SHIP: &str = "vanguard";

/// Per-ship base stats (`config/ships.json`). Derived stats are
/// computed from these plus upgrades and equipped items:
/// `max_health = floor(health * (1 + hp_upgrade_bonus * hp_upgrades + sum(hull hp_bonus)))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipConfig {
    pub health: i64,
    pub shield: i64,
    /// Full speed in px/s.
    pub speed: f64,
    pub base_damage: i64,
    /// Fractional bonus per upgrade level. The damage bonus uses the
    /// same 5% shape as hp/shield.
    pub hp_upgrade_bonus: f64,
    pub shield_upgrade_bonus: f64,
    pub speed_upgrade_bonus: f64,
    pub damage_upgrade_bonus: f64,
    pub attack_range: f64,
    pub attack_cooldown_ms: u64,
    pub projectile_speed: f64,
    pub projectile_type: String,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            health: 100_000,
            shield: 50_000,
            speed: 320.0,
            base_damage: 1_200,
            hp_upgrade_bonus: 0.05,
            shield_upgrade_bonus: 0.05,
            speed_upgrade_bonus: 0.05,
            damage_upgrade_bonus: 0.05,
            attack_range: 700.0,
            attack_cooldown_ms: 1_000,
            projectile_speed: 1_200.0,
            projectile_type: "laser".to_string(),
        }
    }
}

/// Equippable item definitions (`config/items.json`). `slot == None`
/// means the item is cargo only and can never be equipped.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ItemConfig {
    pub slot: Option<String>,
    pub hp_bonus: f64,
    pub shield_bonus: f64,
}

pub fn default_ships() -> HashMap<String, ShipConfig> {
    let mut ships = HashMap::new();
    ships.insert(DEFAULT_SHIP.to_string(), ShipConfig::default());
    ships.insert(
        "corsair".to_string(),
        ShipConfig {
            health: 160_000,
            shield: 90_000,
            speed: 260.0,
            base_damage: 1_900,
            ..ShipConfig::default()
        },
    );
    ships
}

pub fn default_items() -> HashMap<String, ItemConfig> {
    let mut items = HashMap::new();
    items.insert(
        "hull_plate_mk1".to_string(),
        ItemConfig {
            slot: Some("HULL".to_string()),
            hp_bonus: 0.10,
            shield_bonus: 0.0,
        },
    );
    items.insert(
        "shield_cell_mk1".to_string(),
        ItemConfig {
            slot: Some("SHIELD".to_string()),
            hp_bonus: 0.0,
            shield_bonus: 0.10,
        },
    );
    items.insert("salvage_scrap".to_string(), ItemConfig::default());
    items
}
