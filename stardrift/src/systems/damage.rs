//! Shield-then-health damage resolution and death handling. Deaths
//! fan out to rewards, cargo, respawn scheduling and registered
//! observers.

use std::sync::Arc;

use stardrift_protocol::client::{CEntityDamaged, CEntityDestroyed, CExplosionCreated, CNpcLeft};
use stardrift_protocol::{EntityKind, WirePoint};

use crate::crash::CrashReporter;
use crate::entity::ProjectileOwner;
use crate::systems::{cargo, combat, respawn, reward};
use crate::world::World;

/// Explicit observer seam. Anything that wants to piggyback on death
/// handling registers here instead of wrapping the resolver.
pub trait DeathObserver: Send {
    fn on_npc_death(&mut self, _npc_id: &str, _kind: &str, _killer: Option<u64>) {}
    fn on_player_death(&mut self, _client_id: u64, _killer: Option<String>) {}
}

/// Default observer: deaths become crash-reporter breadcrumbs.
pub struct BreadcrumbObserver {
    crash: Arc<CrashReporter>,
}

impl BreadcrumbObserver {
    pub fn new(crash: Arc<CrashReporter>) -> Self {
        Self { crash }
    }
}

impl DeathObserver for BreadcrumbObserver {
    fn on_npc_death(&mut self, npc_id: &str, kind: &str, killer: Option<u64>) {
        self.crash.record(
            killer,
            "npc_death",
            format!("{npc_id} ({kind}) killed by {killer:?}"),
        );
    }

    fn on_player_death(&mut self, client_id: u64, killer: Option<String>) {
        self.crash.record(
            Some(client_id),
            "player_death",
            format!("killed by {killer:?}"),
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageSplit {
    pub shield_absorbed: i64,
    pub health_damage: i64,
}

/// Shield soaks first; both components are clamped non-negative.
pub fn split_damage(damage: i64, shield: i64) -> DamageSplit {
    let damage = damage.max(0);
    let shield_absorbed = damage.min(shield.max(0));
    DamageSplit {
        shield_absorbed,
        health_damage: damage - shield_absorbed,
    }
}

/// Returns true if the NPC died.
pub fn apply_to_npc(
    world: &mut World,
    npc_id: &str,
    damage: i64,
    attacker: Option<u64>,
    now: u64,
) -> bool {
    let Some(npc) = world.npcs.get_mut(npc_id) else {
        return false;
    };
    let split = split_damage(damage, npc.shield);
    npc.shield -= split.shield_absorbed;
    npc.health = (npc.health - split.health_damage).max(0);
    npc.last_damage = now;
    if attacker.is_some() {
        npc.last_attacker = attacker;
    }
    let new_health = npc.health;
    let new_shield = npc.shield;
    let killed = new_health == 0;

    world.broadcast(
        &CEntityDamaged {
            entity_id: npc_id.to_string(),
            entity_type: EntityKind::Npc,
            damage: split.shield_absorbed + split.health_damage,
            new_health,
            new_shield,
        },
        None,
    );
    if killed {
        handle_npc_death(world, npc_id, attacker, now);
    }
    killed
}

fn handle_npc_death(world: &mut World, npc_id: &str, killer: Option<u64>, now: u64) {
    let Some(npc) = world.npcs.remove(npc_id) else {
        return;
    };

    // anyone locked onto this NPC drops combat
    let attackers: Vec<u64> = world
        .sessions
        .iter()
        .filter(|(_, session)| session.target_id == npc.id)
        .map(|(client_id, _)| *client_id)
        .collect();
    for client_id in attackers {
        combat::stop(world, client_id, now, true);
    }

    world.broadcast(
        &CEntityDestroyed {
            entity_id: npc.id.clone(),
            entity_type: EntityKind::Npc,
            killer_id: killer.map(|id| id.to_string()),
        },
        None,
    );
    world.broadcast(&CNpcLeft {
        npc_id: npc.id.clone(),
    }, None);
    world.broadcast_near(
        npc.pos,
        world.registries.server.local_interest_radius,
        &CExplosionCreated {
            explosion_id: format!("exp_{}", npc.id),
            entity_id: npc.id.clone(),
            entity_type: "npc".to_string(),
            position: WirePoint {
                x: npc.pos.x,
                y: npc.pos.y,
            },
            explosion_type: "ship_destroyed".to_string(),
        },
        None,
    );

    respawn::schedule(world, &npc.kind, now);

    if let Some(killer_id) = killer {
        let kill_op_id = format!("k_{}_{}", npc.id, world.tick);
        reward::grant(world, killer_id, &npc.kind, &kill_op_id, &npc.id, now);
        cargo::spawn_on_kill(world, npc.pos, &npc.kind, killer_id, now);
    }

    let mut observers = std::mem::take(&mut world.death_observers);
    for observer in &mut observers {
        observer.on_npc_death(&npc.id, &npc.kind, killer);
    }
    world.death_observers = observers;

    log::debug!("map {}: {} destroyed by {killer:?}", world.map_id, npc.id);
}

/// Returns true if the player died.
pub fn apply_to_player(
    world: &mut World,
    client_id: u64,
    damage: i64,
    attacker: Option<ProjectileOwner>,
    now: u64,
) -> bool {
    let Some(player) = world.players.get_mut(&client_id) else {
        return false;
    };
    if player.is_dead {
        return false;
    }
    let split = split_damage(damage, player.shield);
    player.shield -= split.shield_absorbed;
    player.health = (player.health - split.health_damage).max(0);
    player.last_damage = now;
    let new_health = player.health;
    let new_shield = player.shield;
    let killed = new_health == 0;

    world.broadcast(
        &CEntityDamaged {
            entity_id: client_id.to_string(),
            entity_type: EntityKind::Player,
            damage: split.shield_absorbed + split.health_damage,
            new_health,
            new_shield,
        },
        None,
    );

    if killed {
        handle_player_death(world, client_id, attacker, now);
    } else if let Some(ProjectileOwner::Npc(npc_id)) = &attacker {
        // getting shot pulls the ship back into combat, unless it just
        // disengaged
        combat::try_autostart(world, client_id, &npc_id.clone(), now);
    }
    killed
}

fn handle_player_death(
    world: &mut World,
    client_id: u64,
    killer: Option<ProjectileOwner>,
    now: u64,
) {
    combat::stop(world, client_id, now, true);
    cargo::cancel_collection(world, client_id, None, now);

    if let Some(player) = world.players.get_mut(&client_id) {
        player.is_dead = true;
        player.vel = stardrift_core::math::Vector2::ZERO;
        player.position_inputs.clear();
    }
    // every NPC holding a grudge forgets this player
    for npc in world.npcs.values_mut() {
        if npc.last_attacker == Some(client_id) {
            npc.last_attacker = None;
        }
    }

    let killer_id = killer.as_ref().map(ProjectileOwner::wire_id);
    let pos = world
        .players
        .get(&client_id)
        .map(|p| p.pos)
        .unwrap_or_default();
    world.broadcast(
        &CEntityDestroyed {
            entity_id: client_id.to_string(),
            entity_type: EntityKind::Player,
            killer_id: killer_id.clone(),
        },
        None,
    );
    world.broadcast_near(
        pos,
        world.registries.server.local_interest_radius,
        &CExplosionCreated {
            explosion_id: format!("exp_p{client_id}"),
            entity_id: client_id.to_string(),
            entity_type: "player".to_string(),
            position: WirePoint { x: pos.x, y: pos.y },
            explosion_type: "ship_destroyed".to_string(),
        },
        None,
    );

    let mut observers = std::mem::take(&mut world.death_observers);
    for observer in &mut observers {
        observer.on_player_death(client_id, killer_id.clone());
    }
    world.death_observers = observers;

    log::info!(
        "map {}: player {client_id} destroyed by {killer_id:?}",
        world.map_id
    );
}
