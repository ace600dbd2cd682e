//! NPC behavior state machine, evaluated per NPC per tick.
//! Transitions in priority order: low health flees, recent contact
//! turns aggressive, otherwise cruise.

use std::f64::consts::FRAC_PI_2;

use rand::Rng;
use stardrift_core::math::{clamp_to_extent, Vector2};

use crate::entity::npc::Behavior;
use crate::entity::{ProjectileOwner, TargetRef};
use crate::systems::projectile;
use crate::world::World;

/// `true` while `stamp` is a real event inside the window. Zero means
/// "never happened"; without the guard every NPC would aggro at boot.
fn within(now: u64, stamp: u64, window_ms: u64) -> bool {
    stamp != 0 && now.saturating_sub(stamp) < window_ms
}

struct FireIntent {
    npc_id: String,
    target: u64,
    damage: i64,
    speed: f64,
    projectile_type: String,
}

pub fn tick(world: &mut World, now: u64, dt: f64) {
    let npc_configs = world.registries.npcs.clone();
    let half_w = world.config.half_width();
    let half_h = world.config.half_height();
    let mut fires: Vec<FireIntent> = Vec::new();

    {
        let World {
            npcs,
            players,
            spatial,
            crash,
            ..
        } = world;

        let mut rng = rand::thread_rng();

        for npc in npcs.values_mut() {
            let Some(config) = npc_configs.get(&npc.kind) else {
                continue;
            };

            // a broken entity never takes the tick down with it
            if !npc.pos.is_finite() || !npc.vel.is_finite() {
                log::warn!("npc {} had non-finite state, resetting", npc.id);
                crash.record(None, "npc_reset", npc.id.clone());
                npc.pos = Vector2::ZERO;
                npc.vel = Vector2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
                continue;
            }

            let nearest = spatial
                .nearest_player(players, npc.pos)
                .map(|p| (p.client_id, p.pos));
            if let Some((_, pos)) = nearest {
                if npc.pos.distance(&pos) <= config.attack_range {
                    npc.last_player_in_range = now;
                }
            }

            npc.behavior = if npc.health < npc.max_health / 2 {
                Behavior::Flee
            } else if within(now, npc.last_player_in_range, config.aggro_timeout_ms)
                || within(now, npc.last_damage, config.aggro_timeout_ms)
            {
                Behavior::Aggressive
            } else {
                Behavior::Cruise
            };

            match npc.behavior {
                Behavior::Cruise => {
                    if npc.vel.length() < 0.1 {
                        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
                        npc.vel = Vector2::from_angle(angle) * (0.5 * config.speed);
                        npc.rotation = angle + FRAC_PI_2;
                    }
                }
                Behavior::Aggressive => {
                    // last attacker first, nearest living player otherwise
                    let target = npc
                        .last_attacker
                        .and_then(|cid| {
                            players
                                .get(&cid)
                                .filter(|p| !p.is_dead && !p.is_migrating)
                                .map(|p| (cid, p.pos))
                        })
                        .or(nearest);
                    if let Some((target_id, target_pos)) = target {
                        let to_target = target_pos - npc.pos;
                        let distance = to_target.length();
                        let range = config.attack_range;
                        if distance > 1.4 * range {
                            npc.vel = to_target.with_length(config.speed);
                        } else if distance < 0.7 * range {
                            npc.vel = (-to_target).with_length(config.speed);
                        } else {
                            // orbit: tangent at half speed
                            let tangent = Vector2::new(-to_target.y, to_target.x);
                            npc.vel = tangent.with_length(0.5 * config.speed);
                        }
                        npc.rotation = to_target.y.atan2(to_target.x) + FRAC_PI_2;

                        if distance <= range
                            && now.saturating_sub(npc.last_attack_time) >= config.attack_cooldown_ms
                        {
                            npc.last_attack_time = now;
                            fires.push(FireIntent {
                                npc_id: npc.id.clone(),
                                target: target_id,
                                damage: config.damage,
                                speed: config.projectile_speed,
                                projectile_type: config.projectile_type.clone(),
                            });
                        }
                    }
                }
                Behavior::Flee => {
                    if let Some((_, threat_pos)) = nearest {
                        if npc.vel.length() < 0.1 {
                            npc.vel =
                                (npc.pos - threat_pos).with_length(1.5 * config.speed);
                        }
                        let to_threat = threat_pos - npc.pos;
                        npc.rotation = if to_threat.length() <= config.attack_range {
                            to_threat.y.atan2(to_threat.x) + FRAC_PI_2
                        } else {
                            npc.vel.angle() + FRAC_PI_2
                        };
                    } else if npc.vel.length() < 0.1 {
                        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
                        npc.vel = Vector2::from_angle(angle) * (1.5 * config.speed);
                    }
                }
            }

            npc.pos += npc.vel * dt;

            // reflect off the world edge
            if npc.pos.x.abs() > half_w {
                npc.pos.x = clamp_to_extent(npc.pos.x, half_w);
                npc.vel.x = -npc.vel.x;
            }
            if npc.pos.y.abs() > half_h {
                npc.pos.y = clamp_to_extent(npc.pos.y, half_h);
                npc.vel.y = -npc.vel.y;
            }
        }
    }

    for intent in fires {
        let Some(from) = world.npcs.get(&intent.npc_id).map(|npc| npc.pos) else {
            continue;
        };
        projectile::spawn_homing(
            world,
            ProjectileOwner::Npc(intent.npc_id),
            from,
            TargetRef::Player(intent.target),
            intent.damage,
            intent.speed,
            intent.projectile_type,
            now,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::testutil::{add_player, test_world};

    #[test]
    fn zero_stamp_is_never_within() {
        assert!(!within(1_000, 0, 8_000));
        assert!(within(1_000, 900, 8_000));
        assert!(!within(10_000, 1_000, 8_000));
    }

    #[test]
    fn idle_npc_cruises_at_half_speed() {
        let (mut world, clock) = test_world();
        let now = world.now();
        let npc_id = world.spawn_npc_at("Scouter", Vector2::ZERO, now).unwrap();
        clock.advance(50);
        let now = world.now();
        tick(&mut world, now, 0.05);
        let npc = world.npcs.get(&npc_id).unwrap();
        assert_eq!(npc.behavior, Behavior::Cruise);
        // picked a random heading at 0.5 * base speed (220)
        assert!((npc.vel.length() - 110.0).abs() < 1e-6);
    }

    #[test]
    fn recent_damage_turns_the_npc_aggressive() {
        let (mut world, clock) = test_world();
        let _rx = add_player(&mut world, 1);
        let now = world.now();
        let npc_id = world
            .spawn_npc_at("Scouter", Vector2::new(5_000.0, 0.0), now)
            .unwrap();
        clock.advance(100);
        world.npcs.get_mut(&npc_id).unwrap().last_damage = world.now();
        world.npcs.get_mut(&npc_id).unwrap().last_attacker = Some(1);
        let now = world.now();
        tick(&mut world, now, 0.05);
        let npc = world.npcs.get(&npc_id).unwrap();
        assert_eq!(npc.behavior, Behavior::Aggressive);
        // target is far outside 1.4x attack range: close at full speed
        assert!((npc.vel.length() - 220.0).abs() < 1e-6);
        assert!(npc.vel.x < 0.0, "moves toward the player at the origin");
    }

    #[test]
    fn half_health_forces_flee_over_aggression() {
        let (mut world, clock) = test_world();
        let _rx = add_player(&mut world, 1);
        let now = world.now();
        let npc_id = world
            .spawn_npc_at("Scouter", Vector2::new(400.0, 0.0), now)
            .unwrap();
        clock.advance(100);
        {
            let now = world.now();
            let npc = world.npcs.get_mut(&npc_id).unwrap();
            npc.last_damage = now;
            npc.health = npc.max_health / 2 - 1;
            npc.vel = Vector2::ZERO;
        }
        let now = world.now();
        tick(&mut world, now, 0.05);
        let npc = world.npcs.get(&npc_id).unwrap();
        assert_eq!(npc.behavior, Behavior::Flee);
        // runs away from the origin at 1.5x base speed
        assert!(npc.vel.x > 0.0);
        assert!((npc.vel.length() - 330.0).abs() < 1.0);
    }

    #[test]
    fn aggressive_npc_in_range_fires_a_homing_shot() {
        let (mut world, clock) = test_world();
        let _rx = add_player(&mut world, 1);
        let now = world.now();
        let npc_id = world
            .spawn_npc_at("Scouter", Vector2::new(400.0, 0.0), now)
            .unwrap();
        // past the initial attack cooldown window
        clock.advance(2_000);
        world.npcs.get_mut(&npc_id).unwrap().last_damage = world.now();
        let now = world.now();
        tick(&mut world, now, 0.05);
        assert_eq!(world.projectiles.len(), 1);
        let proj = world.projectiles.values().next().unwrap();
        assert_eq!(proj.owner, ProjectileOwner::Npc(npc_id));
        assert_eq!(proj.target, Some(TargetRef::Player(1)));

        // cooldown holds the next shot back
        clock.advance(50);
        let now = world.now();
        tick(&mut world, now, 0.05);
        assert_eq!(world.projectiles.len(), 1);
    }

    #[test]
    fn broken_npc_state_is_reset_instead_of_crashing() {
        let (mut world, clock) = test_world();
        let now = world.now();
        let npc_id = world.spawn_npc_at("Scouter", Vector2::ZERO, now).unwrap();
        clock.advance(50);
        world.npcs.get_mut(&npc_id).unwrap().pos = Vector2::new(f64::NAN, 0.0);
        let now = world.now();
        tick(&mut world, now, 0.05);
        let npc = world.npcs.get(&npc_id).unwrap();
        assert!(npc.pos.is_finite());
        assert_eq!(npc.pos, Vector2::ZERO);
        assert!(world
            .crash
            .recent_global()
            .iter()
            .any(|e| e.kind == "npc_reset"));
    }
}
