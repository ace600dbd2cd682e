//! Cargo boxes and channelled pickups. Collection is a timed channel
//! revalidated every tick; any failed precondition cancels it with a
//! reason code.

use rand::Rng;
use stardrift_core::math::Vector2;
use stardrift_protocol::client::{
    CCargoBoxCollectStatus, CCargoBoxRemoved, CCargoBoxSpawned, CPlayerStateUpdate,
};
use stardrift_protocol::ErrorCode;

use crate::entity::CargoBox;
use crate::world::World;

/// A running pickup channel for one player.
pub struct CargoCollection {
    pub box_id: String,
    pub started_at: u64,
    /// Set on the first progress tick; drifting away from it cancels.
    pub anchor: Option<Vector2>,
}

/// Roll the drop chance and spawn a box where the NPC died.
pub fn spawn_on_kill(world: &mut World, pos: Vector2, npc_kind: &str, killer_id: u64, now: u64) {
    let npc_configs = world.registries.npcs.clone();
    let Some(config) = npc_configs.get(npc_kind) else {
        return;
    };
    let drop = &config.cargo;
    if drop.resource_types.is_empty() || drop.chance <= 0.0 {
        return;
    }
    let mut rng = rand::thread_rng();
    if rng.gen_range(0.0..1.0) >= drop.chance {
        return;
    }
    let resource = drop.resource_types[rng.gen_range(0..drop.resource_types.len())].clone();
    let quantity = rng.gen_range(drop.quantity_min..=drop.quantity_max.max(drop.quantity_min));
    let rules = &world.registries.server.cargo;
    let expires_at = now + rules.expiry_ms;
    let exclusive_until = now + rules.exclusivity_ms;

    let box_id = world
        .cargo_boxes
        .spawn(|id| CargoBox {
            id,
            pos,
            resource_type: resource,
            quantity,
            npc_type: npc_kind.to_string(),
            killer_id: Some(killer_id),
            spawned_at: now,
            expires_at,
            exclusive_until,
        })
        .id
        .clone();
    let Some(spawned) = world.cargo_boxes.get(&box_id) else {
        return;
    };
    let message = spawned_message(world, spawned);
    world.broadcast_near(
        pos,
        world.registries.server.global_interest_radius,
        &message,
        None,
    );
}

pub fn spawned_message(world: &World, cargo_box: &CargoBox) -> CCargoBoxSpawned {
    CCargoBoxSpawned {
        box_id: cargo_box.id.clone(),
        x: cargo_box.pos.x,
        y: cargo_box.pos.y,
        resource_type: cargo_box.resource_type.clone(),
        npc_type: cargo_box.npc_type.clone(),
        exclusive_until: world.clock.wall_from(cargo_box.exclusive_until),
        expires_at: world.clock.wall_from(cargo_box.expires_at),
    }
}

/// `cargo_box_collect` entry point.
pub fn request_collect(world: &mut World, client_id: u64, box_id: &str, now: u64) {
    let Some(player) = world.players.get(&client_id) else {
        return;
    };
    if player.is_dead {
        deny(world, client_id, box_id, ErrorCode::ValidationFailed);
        return;
    }
    let player_pos = player.pos;

    let Some(cargo_box) = world.cargo_boxes.get(box_id) else {
        deny(world, client_id, box_id, ErrorCode::BoxNotFound);
        return;
    };
    if cargo_box.expired(now) {
        deny(world, client_id, box_id, ErrorCode::BoxExpired);
        return;
    }
    if cargo_box.exclusive_to_other(client_id, now) {
        deny(world, client_id, box_id, ErrorCode::BoxExclusive);
        return;
    }
    if world
        .collections
        .iter()
        .any(|(other, col)| *other != client_id && col.box_id == box_id)
    {
        deny(world, client_id, box_id, ErrorCode::BoxBusy);
        return;
    }
    if player_pos.distance(&cargo_box.pos) > world.registries.server.cargo.collect_distance {
        deny(world, client_id, box_id, ErrorCode::BoxTooFar);
        return;
    }

    // restarting on another box replaces the old channel
    world.collections.insert(
        client_id,
        CargoCollection {
            box_id: box_id.to_string(),
            started_at: now,
            anchor: None,
        },
    );
    world.send_to(client_id, &CCargoBoxCollectStatus::started(box_id));
}

fn deny(world: &World, client_id: u64, box_id: &str, code: ErrorCode) {
    world.send_to(client_id, &CCargoBoxCollectStatus::cancelled(box_id, code));
}

/// Cancel a player's channel. A `reason` notifies them; teardown paths
/// pass `None`.
pub fn cancel_collection(
    world: &mut World,
    client_id: u64,
    reason: Option<ErrorCode>,
    _now: u64,
) {
    let Some(collection) = world.collections.remove(&client_id) else {
        return;
    };
    if let Some(code) = reason {
        world.send_to(
            client_id,
            &CCargoBoxCollectStatus::cancelled(collection.box_id, code),
        );
    }
}

pub fn tick(world: &mut World, now: u64) {
    expire_boxes(world, now);
    progress_collections(world, now);
}

fn expire_boxes(world: &mut World, now: u64) {
    let expired: Vec<String> = world
        .cargo_boxes
        .iter()
        .filter(|(_, b)| b.expired(now))
        .map(|(id, _)| id.clone())
        .collect();
    for box_id in expired {
        world.cargo_boxes.remove(&box_id);
        world.broadcast(
            &CCargoBoxRemoved {
                box_id: box_id.clone(),
                reason: "expired".to_string(),
            },
            None,
        );
        let holders: Vec<u64> = world
            .collections
            .iter()
            .filter(|(_, col)| col.box_id == box_id)
            .map(|(client_id, _)| *client_id)
            .collect();
        for client_id in holders {
            cancel_collection(world, client_id, Some(ErrorCode::BoxExpired), now);
        }
    }
}

fn progress_collections(world: &mut World, now: u64) {
    let channel_ms = world.registries.server.cargo.channel_duration_ms;
    let collect_distance = world.registries.server.cargo.collect_distance;
    let drift_tolerance = world.registries.server.cargo.drift_tolerance;

    let client_ids: Vec<u64> = world.collections.keys().copied().collect();
    for client_id in client_ids {
        let Some(player) = world.players.get(&client_id) else {
            world.collections.remove(&client_id);
            continue;
        };
        let player_pos = player.pos;

        let Some(collection) = world.collections.get_mut(&client_id) else {
            continue;
        };
        let box_id = collection.box_id.clone();
        let Some(cargo_box) = world.cargo_boxes.get(&box_id) else {
            cancel_collection(world, client_id, Some(ErrorCode::BoxNotFound), now);
            continue;
        };
        if player_pos.distance(&cargo_box.pos) > collect_distance {
            cancel_collection(world, client_id, Some(ErrorCode::BoxTooFar), now);
            continue;
        }
        match collection.anchor {
            None => collection.anchor = Some(player_pos),
            Some(anchor) => {
                if anchor.distance(&player_pos) > drift_tolerance {
                    cancel_collection(
                        world,
                        client_id,
                        Some(ErrorCode::InvalidPlayerPosition),
                        now,
                    );
                    continue;
                }
            }
        }
        if now.saturating_sub(collection.started_at) < channel_ms {
            continue;
        }
        complete_collection(world, client_id, &box_id, now);
    }
}

fn complete_collection(world: &mut World, client_id: u64, box_id: &str, now: u64) {
    world.collections.remove(&client_id);
    let Some(cargo_box) = world.cargo_boxes.remove(box_id) else {
        return;
    };
    let Some(player) = world.players.get_mut(&client_id) else {
        return;
    };
    let slot = player
        .resources
        .entry(cargo_box.resource_type.clone())
        .or_insert(0);
    *slot = slot.saturating_add(cargo_box.quantity).max(0);

    player.outbound.send(&CCargoBoxCollectStatus::collected(
        box_id,
        cargo_box.resource_type.clone(),
        cargo_box.quantity,
    ));
    let update = CPlayerStateUpdate {
        inventory: player.wallet.wire(),
        upgrades: player.upgrades.wire(),
        items: player.wire_items(),
        resource_inventory: player.resources.clone(),
        recent_honor: player.recent_honor,
        source: "cargo_collect".to_string(),
        rewards_earned: None,
    };
    player.outbound.send(&update);

    world.broadcast(
        &CCargoBoxRemoved {
            box_id: box_id.to_string(),
            reason: "collected".to_string(),
        },
        None,
    );
    world.enqueue_save(client_id, &format!("cargo_collect:{box_id}"));
    log::debug!(
        "map {}: client {client_id} collected {} x{} from {box_id} at {now}",
        world.map_id,
        cargo_box.resource_type,
        cargo_box.quantity
    );
}
