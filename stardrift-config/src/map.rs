use serde::{Deserialize, Serialize};

/// One simulation shard (`config/maps.json`). Width/height are full
/// extents; world coordinates run `[-w/2, w/2] x [-h/2, h/2]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub npcs: Vec<NpcPopulation>,
    pub hazards: Vec<HazardRegion>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            id: "alpha".to_string(),
            width: 21_000.0,
            height: 13_100.0,
            npcs: Vec::new(),
            hazards: Vec::new(),
        }
    }
}

impl MapConfig {
    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f64 {
        self.height / 2.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcPopulation {
    pub kind: String,
    pub count: u32,
}

/// Circular damage-over-time region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardRegion {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub damage_per_second: i64,
}

pub fn default_maps() -> Vec<MapConfig> {
    vec![
        MapConfig {
            id: "alpha".to_string(),
            npcs: vec![
                NpcPopulation {
                    kind: "Scouter".to_string(),
                    count: 12,
                },
                NpcPopulation {
                    kind: "Guard".to_string(),
                    count: 4,
                },
            ],
            ..MapConfig::default()
        },
        MapConfig {
            id: "beta".to_string(),
            npcs: vec![
                NpcPopulation {
                    kind: "Guard".to_string(),
                    count: 8,
                },
                NpcPopulation {
                    kind: "Kronos".to_string(),
                    count: 1,
                },
            ],
            hazards: vec![HazardRegion {
                x: 4_000.0,
                y: -2_500.0,
                radius: 1_200.0,
                damage_per_second: 900,
            }],
            ..MapConfig::default()
        },
    ]
}
