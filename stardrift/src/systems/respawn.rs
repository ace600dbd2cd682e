//! NPC respawn scheduling and the player respawn policy port.

use stardrift_config::MapConfig;
use stardrift_core::math::Vector2;
use stardrift_protocol::client::CNpcSpawn;

use crate::entity::Player;
use crate::world::World;

/// Removed NPCs come back this long after death.
pub const NPC_RESPAWN_DELAY_MS: u64 = 10_000;
/// Respawn points try to keep this much space from every player.
pub const MIN_PLAYER_DISTANCE: f64 = 1_000.0;
const PLACEMENT_ATTEMPTS: u32 = 10;

pub struct PendingNpcRespawn {
    pub kind: String,
    pub due_at: u64,
}

/// Where destroyed players come back. Deployment-specific; the default
/// uses the map center with full vitals.
pub trait RespawnPolicy: Send {
    fn respawn_position(&self, config: &MapConfig, player: &Player) -> Vector2;
}

pub struct CenterRespawn;

impl RespawnPolicy for CenterRespawn {
    fn respawn_position(&self, _config: &MapConfig, _player: &Player) -> Vector2 {
        Vector2::ZERO
    }
}

pub fn schedule(world: &mut World, kind: &str, now: u64) {
    world.respawn_queue.push(PendingNpcRespawn {
        kind: kind.to_string(),
        due_at: now + NPC_RESPAWN_DELAY_MS,
    });
}

/// 1 Hz sweep: spawn everything that came due.
pub fn tick(world: &mut World, now: u64) {
    if !world.respawn_sweep_due(now) {
        return;
    }
    if world.respawn_queue.is_empty() {
        return;
    }
    let mut due = Vec::new();
    world.respawn_queue.retain_mut(|entry| {
        if entry.due_at <= now {
            due.push(std::mem::take(&mut entry.kind));
            false
        } else {
            true
        }
    });
    for kind in due {
        let pos = choose_spawn_position(world);
        if let Some(npc_id) = world.spawn_npc_at(&kind, pos, now) {
            let Some(npc) = world.npcs.get(&npc_id) else {
                continue;
            };
            let spawn = CNpcSpawn {
                npc: npc.state(),
                t: world.clock.now_wall(),
            };
            world.broadcast_near(
                pos,
                world.registries.server.global_interest_radius,
                &spawn,
                None,
            );
        }
    }
}

/// Random placement that keeps its distance from players, falling back
/// to the central 80% of the map when crowded.
fn choose_spawn_position(world: &World) -> Vector2 {
    let min_d2 = MIN_PLAYER_DISTANCE * MIN_PLAYER_DISTANCE;
    for _ in 0..PLACEMENT_ATTEMPTS {
        let pos = world.random_position();
        let clear = world
            .players
            .values()
            .all(|p| p.pos.distance_squared(&pos) >= min_d2);
        if clear {
            return pos;
        }
    }
    use rand::Rng;
    let mut rng = rand::thread_rng();
    Vector2::new(
        rng.gen_range(-world.config.half_width() * 0.8..=world.config.half_width() * 0.8),
        rng.gen_range(-world.config.half_height() * 0.8..=world.config.half_height() * 0.8),
    )
}
