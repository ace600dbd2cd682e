//! Environmental damage and out-of-combat repair. Both run on a 1 Hz
//! sub-tick: hazard circles apply their damage-per-second, then ships
//! that have been quiet long enough restore shield first, hull after.

use stardrift_protocol::client::CRemotePlayerUpdate;

use crate::entity::npc::Behavior;
use crate::systems::damage;
use crate::world::World;

pub fn tick(world: &mut World, now: u64) {
    if !world.hazard_due(now) {
        return;
    }
    apply_hazards(world, now);
    repair_players(world, now);
    repair_npcs(world, now);
}

fn apply_hazards(world: &mut World, now: u64) {
    if world.config.hazards.is_empty() {
        return;
    }
    let hazards = world.config.hazards.clone();
    let mut burns: Vec<(u64, i64)> = Vec::new();
    for player in world.players.values() {
        if player.is_dead {
            continue;
        }
        let total: i64 = hazards
            .iter()
            .filter(|h| {
                let dx = player.pos.x - h.x;
                let dy = player.pos.y - h.y;
                dx * dx + dy * dy <= h.radius * h.radius
            })
            .map(|h| h.damage_per_second)
            .sum();
        if total > 0 {
            burns.push((player.client_id, total));
        }
    }
    for (client_id, amount) in burns {
        damage::apply_to_player(world, client_id, amount, None, now);
    }
}

fn repair_players(world: &mut World, now: u64) {
    let repair = world.registries.server.repair.clone();
    let wall = world.clock.now_wall();
    let mut touched: Vec<u64> = Vec::new();
    {
        let World {
            players, sessions, ..
        } = world;
        for player in players.values_mut() {
            if player.is_dead || sessions.contains_key(&player.client_id) {
                continue;
            }
            if player.last_damage != 0 && now.saturating_sub(player.last_damage) < repair.delay_ms
            {
                continue;
            }
            let mut changed = false;
            if player.shield < player.max_shield {
                let gain =
                    ((player.max_shield as f64) * repair.shield_fraction_per_sec).ceil() as i64;
                player.shield = (player.shield + gain).min(player.max_shield);
                changed = true;
            } else if player.health < player.max_health {
                let gain =
                    ((player.max_health as f64) * repair.hull_fraction_per_sec).ceil() as i64;
                player.health = (player.health + gain).min(player.max_health);
                changed = true;
            }
            if changed {
                touched.push(player.client_id);
            }
        }
    }
    // fresh vitals ride the player-update channel
    for client_id in touched {
        if let Some(player) = world.players.get(&client_id) {
            let update = CRemotePlayerUpdate {
                p: player.remote_state(),
                t: wall,
            };
            world.broadcast(&update, None);
        }
    }
}

fn repair_npcs(world: &mut World, now: u64) {
    let repair = world.registries.server.repair.clone();
    for npc in world.npcs.values_mut() {
        if npc.behavior != Behavior::Cruise {
            continue;
        }
        if npc.last_damage != 0 && now.saturating_sub(npc.last_damage) < repair.delay_ms {
            continue;
        }
        if npc.shield < npc.max_shield {
            let gain = ((npc.max_shield as f64) * repair.shield_fraction_per_sec).ceil() as i64;
            npc.shield = (npc.shield + gain).min(npc.max_shield);
        } else if npc.health < npc.max_health {
            let gain = ((npc.max_health as f64) * repair.hull_fraction_per_sec).ceil() as i64;
            npc.health = (npc.health + gain).min(npc.max_health);
        }
    }
}
