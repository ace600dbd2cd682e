mod map;
mod npc;
mod server;
mod ship;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;

pub use map::{HazardRegion, MapConfig, NpcPopulation};
pub use npc::{CargoDrop, DropEntry, NpcTypeConfig, RewardTable};
pub use server::{CargoRules, RateLimitConfig, RepairConfig, ServerConfig};
pub use ship::{ItemConfig, ShipConfig, DEFAULT_SHIP};

/// All static game data, loaded once at startup and shared read-only.
/// Constructors receive these as `Arc` handles; nothing mutates them
/// after load.
#[derive(Debug, Clone)]
pub struct Registries {
    pub server: Arc<ServerConfig>,
    pub ships: Arc<HashMap<String, ShipConfig>>,
    pub npcs: Arc<HashMap<String, NpcTypeConfig>>,
    pub items: Arc<HashMap<String, ItemConfig>>,
    pub maps: Arc<Vec<MapConfig>>,
}

impl Registries {
    /// Load every registry from `dir`. A missing or unreadable file
    /// falls back to built-in defaults so a bare checkout still runs.
    pub fn load(dir: &Path) -> Self {
        // empty ship/map registries would leave nowhere to spawn;
        // treat them like missing files
        let ships = load_file(dir, "ships.json")
            .filter(|m: &HashMap<String, ShipConfig>| !m.is_empty())
            .unwrap_or_else(ship::default_ships);
        let maps = load_file(dir, "maps.json")
            .filter(|m: &Vec<MapConfig>| !m.is_empty())
            .unwrap_or_else(map::default_maps);
        Self {
            server: Arc::new(load_file(dir, "server.json").unwrap_or_default()),
            ships: Arc::new(ships),
            npcs: Arc::new(load_file(dir, "npcs.json").unwrap_or_else(npc::default_npcs)),
            items: Arc::new(load_file(dir, "items.json").unwrap_or_else(ship::default_items)),
            maps: Arc::new(maps),
        }
    }

    pub fn defaults() -> Self {
        Self {
            server: Arc::new(ServerConfig::default()),
            ships: Arc::new(ship::default_ships()),
            npcs: Arc::new(npc::default_npcs()),
            items: Arc::new(ship::default_items()),
            maps: Arc::new(map::default_maps()),
        }
    }

    pub fn ship(&self, kind: &str) -> &ShipConfig {
        self.ships
            .get(kind)
            .or_else(|| self.ships.get(ship::DEFAULT_SHIP))
            .or_else(|| self.ships.values().next())
            // load() refuses empty ship registries
            .expect("ship registry is non-empty")
    }
}

fn load_file<T: DeserializeOwned>(dir: &Path, name: &str) -> Option<T> {
    let path = dir.join(name);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) => {
            log::warn!("config {name} not readable ({err}), using defaults");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("config {name} failed to parse ({err}), using defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let reg = Registries::defaults();
        assert!(reg.ships.contains_key(ship::DEFAULT_SHIP));
        assert!(!reg.maps.is_empty());
        // every drop table entry points at a known item
        for npc in reg.npcs.values() {
            for drop in &npc.drops {
                assert!(
                    reg.items.contains_key(&drop.item),
                    "npc drop references unknown item {}",
                    drop.item
                );
            }
        }
        // every map populates known npc types
        for map in reg.maps.iter() {
            for pop in &map.npcs {
                assert!(reg.npcs.contains_key(&pop.kind));
            }
        }
    }

    #[test]
    fn missing_directory_falls_back_to_defaults() {
        let reg = Registries::load(Path::new("/nonexistent/config/dir"));
        assert!(!reg.ships.is_empty());
        assert!(!reg.npcs.is_empty());
    }
}
