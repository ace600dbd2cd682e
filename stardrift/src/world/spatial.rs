use std::collections::HashMap;

use stardrift_core::math::Vector2;

use crate::entity::{Npc, Player};
use crate::world::store::EntityStore;

/// Proximity queries over map entities. The shipped implementation is
/// a linear scan; a grid or quadtree can slot in behind this trait
/// without touching the systems.
pub trait SpatialQuery: Send {
    /// Nearest living player, ignoring dead and migrating hulls.
    fn nearest_player<'w>(
        &self,
        players: &'w HashMap<u64, Player>,
        pos: Vector2,
    ) -> Option<&'w Player>;

    fn players_within<'w>(
        &self,
        players: &'w HashMap<u64, Player>,
        pos: Vector2,
        radius: f64,
    ) -> Vec<&'w Player>;

    fn npcs_within<'w>(
        &self,
        npcs: &'w EntityStore<Npc>,
        pos: Vector2,
        radius: f64,
    ) -> Vec<&'w Npc>;
}

pub struct ScanSpatial;

impl SpatialQuery for ScanSpatial {
    fn nearest_player<'w>(
        &self,
        players: &'w HashMap<u64, Player>,
        pos: Vector2,
    ) -> Option<&'w Player> {
        players
            .values()
            .filter(|p| !p.is_dead && !p.is_migrating)
            .min_by(|a, b| {
                a.pos
                    .distance_squared(&pos)
                    .total_cmp(&b.pos.distance_squared(&pos))
            })
    }

    fn players_within<'w>(
        &self,
        players: &'w HashMap<u64, Player>,
        pos: Vector2,
        radius: f64,
    ) -> Vec<&'w Player> {
        let r2 = radius * radius;
        players
            .values()
            .filter(|p| !p.is_dead && !p.is_migrating)
            .filter(|p| p.pos.distance_squared(&pos) <= r2)
            .collect()
    }

    fn npcs_within<'w>(
        &self,
        npcs: &'w EntityStore<Npc>,
        pos: Vector2,
        radius: f64,
    ) -> Vec<&'w Npc> {
        let r2 = radius * radius;
        npcs.values()
            .filter(|n| n.pos.distance_squared(&pos) <= r2)
            .collect()
    }
}
