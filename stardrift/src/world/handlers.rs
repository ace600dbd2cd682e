//! Frame dispatch on the map actor. Every handler validates the
//! connection's `clientId` (strict) and, where the frame carries one,
//! the `playerId` (coercing shim) before touching state.

use std::f64::consts::FRAC_PI_2;

use serde_json::Value;
use stardrift_core::math::Vector2;

use stardrift_protocol::client::{
    CChatMessage, CError, CExplosionCreated, CHeartbeatAck, CPlayerDataResponse,
    CPlayerRespawned, CPlayerStateUpdate, CRemotePlayerUpdate, CSaveResponse,
};
use stardrift_protocol::ident::{validate_client_id, validate_player_id};
use stardrift_protocol::server::*;
use stardrift_protocol::{ErrorCode, WirePoint, WirePose};

use crate::entity::player::PositionInput;
use crate::entity::ProjectileOwner;
use crate::systems::{cargo, combat, projectile};
use crate::world::World;

/// Shots claiming to originate further than this from the ship are
/// re-anchored to the server position.
const MUZZLE_TOLERANCE: f64 = 300.0;

pub fn handle_frame(world: &mut World, conn_id: u64, message: Serverbound) {
    let now = world.now();
    match message {
        // joins travel as MapCommand::Join; a repeat frame is noise
        Serverbound::Join(_) => {
            log::debug!("client {conn_id} sent join twice, dropping");
        }
        Serverbound::PositionUpdate(update) => handle_position(world, conn_id, update, now),
        Serverbound::Heartbeat(beat) => handle_heartbeat(world, conn_id, beat, now),
        Serverbound::ProjectileFired(fired) => handle_projectile_fired(world, conn_id, fired, now),
        Serverbound::StartCombat(start) => handle_start_combat(world, conn_id, start, now),
        Serverbound::StopCombat(stop) => handle_stop_combat(world, conn_id, stop, now),
        Serverbound::SkillUpgradeRequest(req) => handle_skill_upgrade(world, conn_id, req),
        Serverbound::ExplosionCreated(explosion) => handle_explosion(world, conn_id, explosion),
        Serverbound::ChatMessage(chat) => handle_chat(world, conn_id, chat),
        Serverbound::CargoBoxCollect(collect) => {
            if claims_connection(world, conn_id, collect.client_id) {
                cargo::request_collect(world, conn_id, &collect.box_id, now);
            }
        }
        Serverbound::RequestPlayerData(req) => handle_player_data(world, conn_id, req),
        Serverbound::SaveRequest(_) => {
            world.enqueue_save(conn_id, "client_request");
            world.send_to(
                conn_id,
                &CSaveResponse {
                    ok: true,
                    reason: None,
                },
            );
        }
        Serverbound::RespawnRequest(req) => {
            if claims_connection(world, conn_id, req.client_id) {
                handle_respawn(world, conn_id);
            }
        }
    }
}

/// Strict connection-identity check; mismatches are recorded and the
/// frame is dropped.
fn claims_connection(world: &World, conn_id: u64, claimed: u64) -> bool {
    if validate_client_id(claimed, conn_id) {
        return true;
    }
    log::debug!("client {conn_id} sent a frame claiming clientId {claimed}");
    world
        .crash
        .record(Some(conn_id), "client_id_mismatch", claimed.to_string());
    false
}

/// Coercing player-identity check against the frame's `playerId`.
fn claims_player(world: &World, conn_id: u64, claimed: &Value) -> bool {
    let Some(player) = world.players.get(&conn_id) else {
        return false;
    };
    if validate_player_id(claimed, player.db_id, &player.user_id) {
        return true;
    }
    world.send_to(
        conn_id,
        &CError::new(ErrorCode::ValidationFailed, "playerId does not match"),
    );
    false
}

fn handle_position(world: &mut World, conn_id: u64, update: SPositionUpdate, now: u64) {
    if !claims_connection(world, conn_id, update.client_id) {
        return;
    }
    let finite = update.x.is_finite()
        && update.y.is_finite()
        && update.rotation.is_finite()
        && update.velocity_x.is_finite()
        && update.velocity_y.is_finite();
    if !finite {
        world.send_to(
            conn_id,
            &CError::new(ErrorCode::InvalidPlayerPosition, "non-finite position"),
        );
        return;
    }
    let raw = Vector2::new(update.x, update.y);
    let in_bounds = world.in_bounds(raw);
    let clamped = world.clamp_to_bounds(raw);

    let wall = world.clock.now_wall();
    let Some(player) = world.players.get_mut(&conn_id) else {
        return;
    };
    if player.is_dead {
        return;
    }
    player.queue_position_input(PositionInput {
        pos: clamped,
        rotation: update.rotation,
        vel: Vector2::new(update.velocity_x, update.velocity_y),
        tick: update.tick,
        in_bounds,
    });
    player.last_input_at = now;

    // optimistic relay: observers see the move before the integrate step
    let relayed = CRemotePlayerUpdate {
        p: player.remote_state(),
        t: wall,
    };
    world.broadcast(&relayed, Some(conn_id));
}

fn handle_heartbeat(world: &mut World, conn_id: u64, beat: SHeartbeat, now: u64) {
    if !claims_connection(world, conn_id, beat.client_id) {
        return;
    }
    let wall = world.clock.now_wall();
    if let Some(player) = world.players.get_mut(&conn_id) {
        player.last_input_at = now;
        player.outbound.send(&CHeartbeatAck {
            timestamp: beat.timestamp,
            t: wall,
        });
    }
}

/// Free-aim shot. The client supplies geometry; damage and speed are
/// always the server's numbers.
fn handle_projectile_fired(world: &mut World, conn_id: u64, fired: SProjectileFired, now: u64) {
    if !claims_connection(world, conn_id, fired.client_id) {
        return;
    }
    if !claims_player(world, conn_id, &fired.player_id) {
        return;
    }
    let Some(player) = world.players.get(&conn_id) else {
        return;
    };
    if player.is_dead {
        return;
    }
    let ship = world.registries.ship(&player.ship);
    let damage = player.effective_damage(ship);
    let speed = ship.projectile_speed;
    let projectile_type = if fired.projectile_type.len() <= 32 && !fired.projectile_type.is_empty()
    {
        fired.projectile_type.clone()
    } else {
        ship.projectile_type.clone()
    };

    let claimed_dir = Vector2::new(fired.velocity.x, fired.velocity.y);
    let vel = if claimed_dir.is_finite() && claimed_dir.length() > f64::EPSILON {
        claimed_dir.with_length(speed)
    } else {
        Vector2::from_angle(player.rotation - FRAC_PI_2) * speed
    };
    let claimed_muzzle = Vector2::new(fired.position.x, fired.position.y);
    let from = if claimed_muzzle.is_finite()
        && claimed_muzzle.distance(&player.pos) <= MUZZLE_TOLERANCE
    {
        claimed_muzzle
    } else {
        player.pos
    };

    projectile::spawn_free(
        world,
        ProjectileOwner::Player(conn_id),
        from,
        vel,
        damage,
        projectile_type,
        now,
    );
}

fn handle_start_combat(world: &mut World, conn_id: u64, start: SStartCombat, now: u64) {
    if !claims_connection(world, conn_id, start.client_id) {
        return;
    }
    if !claims_player(world, conn_id, &start.player_id) {
        return;
    }
    combat::start(world, conn_id, &start.npc_id, now);
}

fn handle_stop_combat(world: &mut World, conn_id: u64, stop: SStopCombat, now: u64) {
    if !claims_connection(world, conn_id, stop.client_id) {
        return;
    }
    if !claims_player(world, conn_id, &stop.player_id) {
        return;
    }
    combat::stop(world, conn_id, now, true);
}

fn handle_skill_upgrade(world: &mut World, conn_id: u64, req: SSkillUpgradeRequest) {
    if !claims_connection(world, conn_id, req.client_id) {
        return;
    }
    if !claims_player(world, conn_id, &req.player_id) {
        return;
    }
    let items = world.registries.items.clone();
    let ship = {
        let Some(player) = world.players.get(&conn_id) else {
            return;
        };
        world.registries.ship(&player.ship).clone()
    };
    let Some(player) = world.players.get_mut(&conn_id) else {
        return;
    };
    if player.wallet.skill_points <= 0 {
        player.outbound.send(&CError::new(
            ErrorCode::ValidationFailed,
            "no skill points available",
        ));
        return;
    }
    player.wallet.skill_points -= 1;
    match req.upgrade_type {
        UpgradeType::Hp => player.upgrades.hp += 1,
        UpgradeType::Shield => player.upgrades.shield += 1,
        UpgradeType::Speed => player.upgrades.speed += 1,
        UpgradeType::Damage => player.upgrades.damage += 1,
    }
    player.recompute_derived(&ship, &items);
    let update = CPlayerStateUpdate {
        inventory: player.wallet.wire(),
        upgrades: player.upgrades.wire(),
        items: player.wire_items(),
        resource_inventory: player.resources.clone(),
        recent_honor: player.recent_honor,
        source: "skill_upgrade".to_string(),
        rewards_earned: None,
    };
    player.outbound.send(&update);
    world.enqueue_save(conn_id, "skill_upgrade");
}

fn handle_explosion(world: &mut World, conn_id: u64, explosion: SExplosionCreated) {
    if !claims_connection(world, conn_id, explosion.client_id) {
        return;
    }
    if !explosion.position.x.is_finite() || !explosion.position.y.is_finite() {
        return;
    }
    let entity_id = match &explosion.entity_id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return,
    };
    let center = Vector2::new(explosion.position.x, explosion.position.y);
    world.broadcast_near(
        center,
        world.registries.server.local_interest_radius,
        &CExplosionCreated {
            explosion_id: explosion.explosion_id,
            entity_id,
            entity_type: explosion.entity_type,
            position: WirePoint {
                x: center.x,
                y: center.y,
            },
            explosion_type: explosion.explosion_type,
        },
        Some(conn_id),
    );
}

fn handle_chat(world: &mut World, conn_id: u64, chat: SChatMessage) {
    if !claims_connection(world, conn_id, chat.client_id) {
        return;
    }
    let banned = world.registries.server.chat_banned_words.clone();
    let Some(content) = sanitize_chat(&chat.content, &banned) else {
        world.send_to(
            conn_id,
            &CError::new(ErrorCode::ValidationFailed, "invalid chat message"),
        );
        return;
    };
    let Some(player) = world.players.get(&conn_id) else {
        return;
    };
    let message = CChatMessage {
        client_id: conn_id,
        nickname: player.nickname.clone(),
        content,
        t: world.clock.now_wall(),
    };
    world.broadcast(&message, None);
}

fn handle_player_data(world: &mut World, conn_id: u64, req: SRequestPlayerData) {
    if !claims_connection(world, conn_id, req.client_id) {
        return;
    }
    if !claims_player(world, conn_id, &req.player_id) {
        return;
    }
    let Some(player) = world.players.get(&conn_id) else {
        return;
    };
    let response = CPlayerDataResponse {
        client_id: player.client_id,
        player_db_id: player.db_id,
        nickname: player.nickname.clone(),
        inventory: player.wallet.wire(),
        upgrades: player.upgrades.wire(),
        items: player.wire_items(),
        resource_inventory: player.resources.clone(),
        rank: player.rank,
    };
    player.outbound.send(&response);
}

fn handle_respawn(world: &mut World, conn_id: u64) {
    let pos = {
        let Some(player) = world.players.get(&conn_id) else {
            return;
        };
        if !player.is_dead {
            world.send_to(
                conn_id,
                &CError::new(ErrorCode::ValidationFailed, "ship is not destroyed"),
            );
            return;
        }
        world.respawn_policy.respawn_position(&world.config, player)
    };
    let Some(player) = world.players.get_mut(&conn_id) else {
        return;
    };
    player.pos = pos;
    player.vel = Vector2::ZERO;
    player.health = player.max_health;
    player.shield = player.max_shield;
    player.is_dead = false;
    let respawned = CPlayerRespawned {
        client_id: conn_id,
        position: WirePose {
            x: pos.x,
            y: pos.y,
            rotation: player.rotation,
        },
        health: player.health,
        shield: player.shield,
    };
    world.broadcast(&respawned, None);
}

/// Strip markup, trim, enforce 1..=200 chars, then mask banned words.
pub(crate) fn sanitize_chat(raw: &str, banned: &[String]) -> Option<String> {
    let stripped = strip_tags(raw);
    let trimmed = stripped.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 200 {
        return None;
    }
    Some(mask_banned(trimmed, banned))
}

fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn mask_banned(text: &str, banned: &[String]) -> String {
    if banned.is_empty() {
        return text.to_string();
    }
    text.split_whitespace()
        .map(|token| {
            let lowered = token.to_lowercase();
            if banned.iter().any(|word| {
                !word.is_empty() && lowered.contains(&word.to_lowercase())
            }) {
                "*".repeat(token.chars().count())
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_rejects_empty_and_oversized() {
        assert_eq!(sanitize_chat("   ", &[]), None);
        assert_eq!(sanitize_chat(&"x".repeat(201), &[]), None);
        assert_eq!(sanitize_chat("hello", &[]).as_deref(), Some("hello"));
    }

    #[test]
    fn chat_strips_markup() {
        assert_eq!(
            sanitize_chat("hi <b>there</b>!", &[]).as_deref(),
            Some("hi there!")
        );
        // tags go, their inner text stays
        assert_eq!(
            sanitize_chat("<script>alert(1)</script>", &[]).as_deref(),
            Some("alert(1)")
        );
        // a message that is only markup collapses to nothing
        assert_eq!(sanitize_chat("<b></b>", &[]), None);
    }

    #[test]
    fn chat_masks_banned_words() {
        let banned = vec!["slag".to_string()];
        assert_eq!(
            sanitize_chat("you absolute SLAG pilot", &banned).as_deref(),
            Some("you absolute **** pilot")
        );
    }
}
