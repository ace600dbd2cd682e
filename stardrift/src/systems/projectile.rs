//! Projectile engine: steering, integration, lifetime, collision.
//! Tick order is steer, integrate, cull, collide, broadcast.

use std::collections::HashMap;

use stardrift_core::math::{angle_difference, Vector2};
use stardrift_protocol::client::{
    CProjectileDestroyed, CProjectileFired, CProjectileUpdates, ProjectileDelta,
};
use stardrift_protocol::WirePoint;

use crate::entity::projectile::{
    homing_lifetime_ms, Projectile, ProjectileOwner, TargetRef, FREE_FLIGHT_LIFETIME_MS,
    MAX_TARGET_DISTANCE,
};
use crate::entity::{Npc, Player};
use crate::systems::damage;
use crate::world::store::EntityStore;
use crate::world::World;

/// Homing steering turn rate, radians per second.
pub const TURN_RATE: f64 = 4.0;
pub const PLAYER_COLLISION_RADIUS: f64 = 30.0;
pub const NPC_COLLISION_BASE_RADIUS: f64 = 40.0;

pub fn spawn_homing(
    world: &mut World,
    owner: ProjectileOwner,
    from: Vector2,
    target: TargetRef,
    damage: i64,
    speed: f64,
    projectile_type: String,
    now: u64,
) -> Option<String> {
    let target_pos = resolve_target_pos(&world.npcs, &world.players, &target)?;
    let initial_distance = from.distance(&target_pos);
    let vel = (target_pos - from).with_length(speed);
    let lifetime_ms = homing_lifetime_ms(initial_distance, speed, &owner);
    let id = world
        .projectiles
        .spawn(|id| Projectile {
            id,
            owner: owner.clone(),
            pos: from,
            vel,
            damage,
            projectile_type: projectile_type.clone(),
            target: Some(target.clone()),
            created_at: now,
            initial_distance: Some(initial_distance),
            lifetime_ms,
        })
        .id
        .clone();

    world.broadcast(
        &CProjectileFired {
            projectile_id: id.clone(),
            shooter_id: owner.wire_id(),
            source: owner.source(),
            position: WirePoint {
                x: from.x,
                y: from.y,
            },
            velocity: WirePoint { x: vel.x, y: vel.y },
            projectile_type,
            target_id: Some(target.wire_id()),
        },
        None,
    );
    Some(id)
}

/// Free-aimed shot; flies straight and hits whatever crosses it.
pub fn spawn_free(
    world: &mut World,
    owner: ProjectileOwner,
    from: Vector2,
    vel: Vector2,
    damage: i64,
    projectile_type: String,
    now: u64,
) -> String {
    let id = world
        .projectiles
        .spawn(|id| Projectile {
            id,
            owner: owner.clone(),
            pos: from,
            vel,
            damage,
            projectile_type: projectile_type.clone(),
            target: None,
            created_at: now,
            initial_distance: None,
            lifetime_ms: FREE_FLIGHT_LIFETIME_MS,
        })
        .id
        .clone();

    world.broadcast(
        &CProjectileFired {
            projectile_id: id.clone(),
            shooter_id: owner.wire_id(),
            source: owner.source(),
            position: WirePoint {
                x: from.x,
                y: from.y,
            },
            velocity: WirePoint { x: vel.x, y: vel.y },
            projectile_type,
            target_id: None,
        },
        None,
    );
    id
}

struct Hit {
    projectile_id: String,
    target: TargetRef,
    damage: i64,
    owner: ProjectileOwner,
}

pub fn tick(world: &mut World, now: u64, dt: f64) {
    let mut removals: Vec<(String, &'static str)> = Vec::new();
    let mut hits: Vec<Hit> = Vec::new();

    {
        let World {
            projectiles,
            npcs,
            players,
            ..
        } = world;

        for (_, proj) in projectiles.iter_mut() {
            // homing: orphan/range checks and steering before moving
            if let Some(target) = proj.target.clone() {
                match resolve_target_pos(npcs, players, &target) {
                    None => {
                        removals.push((proj.id.clone(), "orphaned"));
                        continue;
                    }
                    Some(target_pos) => {
                        if proj.pos.distance(&target_pos) > MAX_TARGET_DISTANCE {
                            removals.push((proj.id.clone(), "out_of_range"));
                            continue;
                        }
                        steer(proj, target_pos, dt);
                    }
                }
            }

            proj.pos += proj.vel * dt;

            if proj.expired(now) {
                removals.push((proj.id.clone(), "expired"));
                continue;
            }
            if proj.out_of_bounds() {
                removals.push((proj.id.clone(), "out_of_bounds"));
                continue;
            }

            if let Some(target) = collide(proj, npcs, players) {
                hits.push(Hit {
                    projectile_id: proj.id.clone(),
                    target,
                    damage: proj.damage,
                    owner: proj.owner.clone(),
                });
                removals.push((proj.id.clone(), "hit"));
            }
        }
    }

    for (id, reason) in removals {
        if world.projectiles.remove(&id).is_some() {
            world.broadcast(
                &CProjectileDestroyed {
                    projectile_id: id,
                    reason: reason.to_string(),
                },
                None,
            );
        }
    }

    for hit in hits {
        let attacker = match &hit.owner {
            ProjectileOwner::Player(client_id) => Some(*client_id),
            ProjectileOwner::Npc(_) => None,
        };
        match hit.target {
            TargetRef::Npc(npc_id) => {
                damage::apply_to_npc(world, &npc_id, hit.damage, attacker, now);
            }
            TargetRef::Player(client_id) => {
                damage::apply_to_player(world, client_id, hit.damage, Some(hit.owner), now);
            }
        }
    }

    broadcast_homing_updates(world);
}

/// Rotate the velocity toward the target by at most `TURN_RATE * dt`,
/// preserving magnitude.
fn steer(proj: &mut Projectile, target_pos: Vector2, dt: f64) {
    let speed = proj.vel.length();
    if speed < f64::EPSILON {
        return;
    }
    let current = proj.vel.angle();
    let desired = (target_pos - proj.pos).angle();
    let max_turn = TURN_RATE * dt;
    let turn = angle_difference(current, desired).clamp(-max_turn, max_turn);
    proj.vel = Vector2::from_angle(current + turn) * speed;
}

fn resolve_target_pos(
    npcs: &EntityStore<Npc>,
    players: &HashMap<u64, Player>,
    target: &TargetRef,
) -> Option<Vector2> {
    match target {
        TargetRef::Npc(id) => npcs.get(id).map(|npc| npc.pos),
        TargetRef::Player(client_id) => players
            .get(client_id)
            .filter(|p| !p.is_dead && !p.is_migrating)
            .map(|p| p.pos),
    }
}

/// NPC hitboxes grow with closing speed so fast passes still register:
/// +10 px per 100 px/s of relative speed above 200, at most +80.
fn npc_collision_radius(proj: &Projectile, npc: &Npc) -> f64 {
    let relative_speed = (proj.vel - npc.vel).length();
    let bonus = ((relative_speed - 200.0) / 100.0 * 10.0).clamp(0.0, 80.0);
    NPC_COLLISION_BASE_RADIUS + bonus
}

fn collide(
    proj: &Projectile,
    npcs: &EntityStore<Npc>,
    players: &HashMap<u64, Player>,
) -> Option<TargetRef> {
    match &proj.target {
        // homing projectiles only ever hit their lock
        Some(TargetRef::Npc(id)) => {
            let npc = npcs.get(id)?;
            (proj.pos.distance(&npc.pos) <= npc_collision_radius(proj, npc))
                .then(|| TargetRef::Npc(id.clone()))
        }
        Some(TargetRef::Player(client_id)) => {
            let player = players.get(client_id)?;
            if player.is_dead {
                return None;
            }
            (proj.pos.distance(&player.pos) <= PLAYER_COLLISION_RADIUS)
                .then_some(TargetRef::Player(*client_id))
        }
        None => {
            for npc in npcs.values() {
                if let ProjectileOwner::Npc(shooter) = &proj.owner {
                    if *shooter == npc.id {
                        continue;
                    }
                }
                if proj.pos.distance(&npc.pos) <= npc_collision_radius(proj, npc) {
                    return Some(TargetRef::Npc(npc.id.clone()));
                }
            }
            for player in players.values() {
                if player.is_dead {
                    continue;
                }
                if let ProjectileOwner::Player(shooter) = &proj.owner {
                    if *shooter == player.client_id {
                        continue;
                    }
                }
                if proj.pos.distance(&player.pos) <= PLAYER_COLLISION_RADIUS {
                    return Some(TargetRef::Player(player.client_id));
                }
            }
            None
        }
    }
}

/// Ship fresh homing rows to players near each projectile.
fn broadcast_homing_updates(world: &World) {
    let radius = world.registries.server.projectile_interest_radius;
    let r2 = radius * radius;
    let t = world.clock.now_wall();
    for player in world.players.values() {
        let rows: Vec<ProjectileDelta> = world
            .projectiles
            .values()
            .filter(|proj| proj.is_homing())
            .filter(|proj| proj.pos.distance_squared(&player.pos) <= r2)
            .map(|proj| ProjectileDelta {
                id: proj.id.clone(),
                x: proj.pos.x,
                y: proj.pos.y,
                velocity_x: proj.vel.x,
                velocity_y: proj.vel.y,
            })
            .collect();
        if rows.is_empty() {
            continue;
        }
        player.outbound.send(&CProjectileUpdates { p: rows, t });
    }
}
