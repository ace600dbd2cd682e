//! Per-player combat sessions. A session locks one NPC target and
//! fires on the ship's cadence; the first shot goes out immediately to
//! mask latency.

use stardrift_protocol::client::{CCombatError, CCombatUpdate};
use stardrift_protocol::ErrorCode;

use crate::entity::{ProjectileOwner, TargetRef};
use crate::systems::projectile;
use crate::world::World;

/// Damage received does not re-engage a ship that disengaged less than
/// this long ago.
pub const AUTO_ENGAGE_LOCKOUT_MS: u64 = 3_000;

pub struct CombatSession {
    pub session_id: String,
    pub target_id: String,
    pub last_attack_time: u64,
}

/// `start_combat` entry point; all failures answer the client with a
/// `combat_error`.
pub fn start(world: &mut World, client_id: u64, npc_id: &str, now: u64) {
    let Some(player) = world.players.get(&client_id) else {
        return;
    };
    if player.is_dead {
        world.send_to(
            client_id,
            &CCombatError {
                code: ErrorCode::ValidationFailed,
                message: "cannot start combat while destroyed".to_string(),
                active_session_id: None,
            },
        );
        return;
    }
    if let Some(existing) = world.sessions.get(&client_id) {
        let active = existing.session_id.clone();
        world.send_to(
            client_id,
            &CCombatError {
                code: ErrorCode::MultipleCombatSessions,
                message: "a combat session is already running".to_string(),
                active_session_id: Some(active),
            },
        );
        return;
    }
    if !world.npcs.contains(npc_id) {
        world.send_to(
            client_id,
            &CCombatError {
                code: ErrorCode::NpcNotFound,
                message: format!("npc {npc_id} does not exist on this map"),
                active_session_id: None,
            },
        );
        return;
    }
    begin(world, client_id, npc_id, now);
}

/// Retaliation path: engage the attacker if the ship is free to fight.
/// Silent on every precondition failure.
pub fn try_autostart(world: &mut World, client_id: u64, npc_id: &str, now: u64) {
    if world.sessions.contains_key(&client_id) {
        return;
    }
    let Some(player) = world.players.get(&client_id) else {
        return;
    };
    if player.is_dead
        || (player.last_combat_stop != 0
            && now.saturating_sub(player.last_combat_stop) < AUTO_ENGAGE_LOCKOUT_MS)
    {
        return;
    }
    if !world.npcs.contains(npc_id) {
        return;
    }
    begin(world, client_id, npc_id, now);
}

fn begin(world: &mut World, client_id: u64, npc_id: &str, now: u64) {
    let session_id = format!("combat_{}", world.next_session_id);
    world.next_session_id += 1;
    world.sessions.insert(
        client_id,
        CombatSession {
            session_id: session_id.clone(),
            target_id: npc_id.to_string(),
            last_attack_time: now,
        },
    );
    fire(world, client_id, now);

    if let Some(player) = world.players.get(&client_id) {
        world.broadcast(
            &CCombatUpdate {
                player_id: player.db_id,
                client_id,
                npc_id: Some(npc_id.to_string()),
                is_attacking: true,
                session_id: Some(session_id),
                last_attack_time: now,
            },
            None,
        );
    }
}

/// Remove the session. `notify` broadcasts the disengage; teardown
/// paths pass false.
pub fn stop(world: &mut World, client_id: u64, now: u64, notify: bool) {
    let Some(session) = world.sessions.remove(&client_id) else {
        return;
    };
    let db_id = if let Some(player) = world.players.get_mut(&client_id) {
        player.last_combat_stop = now;
        player.db_id
    } else {
        return;
    };
    if notify {
        world.broadcast(
            &CCombatUpdate {
                player_id: db_id,
                client_id,
                npc_id: Some(session.target_id),
                is_attacking: false,
                session_id: Some(session.session_id),
                last_attack_time: session.last_attack_time,
            },
            None,
        );
    }
}

/// Cadence pass, once per tick.
pub fn tick(world: &mut World, now: u64) {
    let client_ids: Vec<u64> = world.sessions.keys().copied().collect();
    for client_id in client_ids {
        let Some(session) = world.sessions.get(&client_id) else {
            continue;
        };
        let target_id = session.target_id.clone();
        let last_attack = session.last_attack_time;

        if !world.npcs.contains(&target_id) {
            stop(world, client_id, now, true);
            continue;
        }
        let Some(player) = world.players.get(&client_id) else {
            world.sessions.remove(&client_id);
            continue;
        };
        if player.is_dead {
            stop(world, client_id, now, true);
            continue;
        }
        let cooldown = world.registries.ship(&player.ship).attack_cooldown_ms;
        if now.saturating_sub(last_attack) >= cooldown {
            fire(world, client_id, now);
        }
    }
}

fn fire(world: &mut World, client_id: u64, now: u64) {
    let Some(session) = world.sessions.get_mut(&client_id) else {
        return;
    };
    session.last_attack_time = now;
    let target_id = session.target_id.clone();

    let Some(player) = world.players.get(&client_id) else {
        return;
    };
    let ship = world.registries.ship(&player.ship);
    let damage = player.effective_damage(ship);
    let speed = ship.projectile_speed;
    let projectile_type = ship.projectile_type.clone();
    let from = player.pos;

    projectile::spawn_homing(
        world,
        ProjectileOwner::Player(client_id),
        from,
        TargetRef::Npc(target_id),
        damage,
        speed,
        projectile_type,
        now,
    );
}
