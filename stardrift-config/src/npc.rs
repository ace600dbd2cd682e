use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One NPC archetype (`config/npcs.json`), keyed by type name
/// (`Scouter`, `Kronos`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcTypeConfig {
    pub health: i64,
    pub shield: i64,
    /// Full speed in px/s. Cruise runs at half of this, flee at 1.5x.
    pub speed: f64,
    pub damage: i64,
    pub attack_range: f64,
    pub attack_cooldown_ms: u64,
    /// How long damage or player proximity keeps the NPC aggressive.
    pub aggro_timeout_ms: u64,
    pub projectile_speed: f64,
    pub projectile_type: String,
    pub rewards: RewardTable,
    /// Item drop candidates for the single-roll drop.
    pub drops: Vec<DropEntry>,
    pub cargo: CargoDrop,
}

impl Default for NpcTypeConfig {
    fn default() -> Self {
        Self {
            health: 8_000,
            shield: 4_000,
            speed: 220.0,
            damage: 450,
            attack_range: 600.0,
            attack_cooldown_ms: 1_500,
            aggro_timeout_ms: 8_000,
            projectile_speed: 900.0,
            projectile_type: "plasma".to_string(),
            rewards: RewardTable::default(),
            drops: Vec::new(),
            cargo: CargoDrop::default(),
        }
    }
}

/// Currencies credited on a kill. Every field must be finite and
/// non-negative; the reward pipeline rejects the whole table otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RewardTable {
    pub credits: i64,
    pub cosmos: i64,
    pub experience: i64,
    pub honor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropEntry {
    pub item: String,
    /// Probability window width in `[0, 1]`. Entries with chance <= 0
    /// are never candidates.
    pub chance: f64,
}

/// Cargo box parameters rolled on NPC death.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CargoDrop {
    pub chance: f64,
    pub resource_types: Vec<String>,
    pub quantity_min: i64,
    pub quantity_max: i64,
}

impl Default for CargoDrop {
    fn default() -> Self {
        Self {
            chance: 0.6,
            resource_types: vec!["prometium".to_string(), "endurium".to_string()],
            quantity_min: 2,
            quantity_max: 8,
        }
    }
}

pub fn default_npcs() -> HashMap<String, NpcTypeConfig> {
    let mut npcs = HashMap::new();
    npcs.insert(
        "Scouter".to_string(),
        NpcTypeConfig {
            rewards: RewardTable {
                credits: 400,
                cosmos: 1,
                experience: 400,
                honor: 2,
            },
            drops: vec![DropEntry {
                item: "salvage_scrap".to_string(),
                chance: 0.15,
            }],
            ..NpcTypeConfig::default()
        },
    );
    npcs.insert(
        "Kronos".to_string(),
        NpcTypeConfig {
            health: 40_000,
            shield: 24_000,
            speed: 170.0,
            damage: 1_400,
            attack_range: 750.0,
            rewards: RewardTable {
                credits: 4_000,
                cosmos: 15,
                experience: 3_200,
                honor: 16,
            },
            drops: vec![
                DropEntry {
                    item: "hull_plate_mk1".to_string(),
                    chance: 0.05,
                },
                DropEntry {
                    item: "shield_cell_mk1".to_string(),
                    chance: 0.05,
                },
            ],
            ..NpcTypeConfig::default()
        },
    );
    npcs.insert(
        "Guard".to_string(),
        NpcTypeConfig {
            health: 18_000,
            shield: 12_000,
            damage: 800,
            rewards: RewardTable {
                credits: 1_500,
                cosmos: 4,
                experience: 1_200,
                honor: 6,
            },
            ..NpcTypeConfig::default()
        },
    );
    npcs
}
