//! Idempotent kill rewards. Each grant is keyed by a `killOpId`; a
//! replay inside the player's recent-ops window mutates nothing.

use rand::seq::SliceRandom;
use rand::Rng;
use stardrift_config::{DropEntry, RewardTable};
use stardrift_protocol::client::{CPlayerStateUpdate, RewardsEarned};
use uuid::Uuid;

use crate::entity::player::OwnedItem;
use crate::world::World;

pub fn grant(
    world: &mut World,
    client_id: u64,
    npc_kind: &str,
    kill_op_id: &str,
    npc_id: &str,
    now: u64,
) {
    let npc_configs = world.registries.npcs.clone();
    let Some(config) = npc_configs.get(npc_kind) else {
        log::warn!("reward for unknown npc type {npc_kind}, skipping");
        return;
    };
    if !rewards_valid(&config.rewards) {
        log::warn!(
            "npc type {npc_kind} has an invalid reward table, aborting grant {kill_op_id}"
        );
        return;
    }

    let crash = world.crash.clone();
    let store = world.store.clone();
    let items = world.registries.items.clone();
    let Some(player) = world.players.get_mut(&client_id) else {
        return;
    };

    if !player.recent_ops.remember(kill_op_id) {
        log::debug!("duplicate kill op {kill_op_id} for client {client_id}, suppressed");
        crash.record(
            Some(client_id),
            "loot_duplicate_suppressed",
            kill_op_id.to_string(),
        );
        return;
    }

    let rewards = config.rewards;
    player.wallet.credits += rewards.credits;
    player.wallet.cosmos += rewards.cosmos;
    player.wallet.experience += rewards.experience;
    player.wallet.honor += rewards.honor;
    player.wallet.clamp_non_negative();

    let dropped = roll_drop(&config.drops, &mut rand::thread_rng());
    if let Some(item_id) = &dropped {
        let instance_id = Uuid::new_v4().to_string();
        player.items.push(OwnedItem {
            id: item_id.clone(),
            instance_id: instance_id.clone(),
            acquired_at: now,
            slot: None,
        });
        // a drop whose slot is empty goes straight into service;
        // replacing fitted gear stays a player decision
        let slot_free = items
            .get(item_id)
            .and_then(|cfg| cfg.slot.as_deref())
            .map(|slot| !player.items.iter().any(|i| i.slot.as_deref() == Some(slot)))
            .unwrap_or(false);
        if slot_free && player.equip(&instance_id, &items) {
            let ship = world.registries.ship(&player.ship).clone();
            player.recompute_derived(&ship, &items);
        }
    }

    let update = CPlayerStateUpdate {
        inventory: player.wallet.wire(),
        upgrades: player.upgrades.wire(),
        items: player.wire_items(),
        resource_inventory: player.resources.clone(),
        recent_honor: player.recent_honor,
        source: "npc_reward".to_string(),
        rewards_earned: Some(RewardsEarned {
            credits: rewards.credits,
            cosmos: rewards.cosmos,
            experience: rewards.experience,
            honor: rewards.honor,
            item: dropped,
            kill_op_id: kill_op_id.to_string(),
            npc_id: npc_id.to_string(),
        }),
    };
    player.outbound.send(&update);

    let user_id = player.user_id;
    let honor_total = player.wallet.honor;
    if rewards.honor > 0 {
        // fire-and-forget; the tick never awaits the store
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = store.clone();
            handle.spawn(async move {
                if let Err(err) = store
                    .save_honor_snapshot(user_id, honor_total, "npc_reward")
                    .await
                {
                    log::error!("honor snapshot failed for {user_id}: {err}");
                }
            });
        }
    }

    world.enqueue_save(client_id, &format!("npc_reward:{kill_op_id}"));
}

/// A reward table with any negative field poisons the whole grant.
/// Fields are integers so finiteness holds by construction.
fn rewards_valid(rewards: &RewardTable) -> bool {
    rewards.credits >= 0 && rewards.cosmos >= 0 && rewards.experience >= 0 && rewards.honor >= 0
}

/// Single-roll drop: shuffle the positive-chance candidates, roll once
/// in `[0, 1)`, and walk the cumulative windows. At most one item.
pub fn roll_drop<R: Rng>(drops: &[DropEntry], rng: &mut R) -> Option<String> {
    let mut candidates: Vec<&DropEntry> = drops.iter().filter(|d| d.chance > 0.0).collect();
    if candidates.is_empty() {
        return None;
    }
    candidates.shuffle(rng);
    let roll: f64 = rng.gen_range(0.0..1.0);
    let mut cumulative = 0.0;
    for candidate in candidates {
        if roll >= cumulative && roll < cumulative + candidate.chance {
            return Some(candidate.item.clone());
        }
        cumulative += candidate.chance;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn no_candidates_means_no_drop() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(roll_drop(&[], &mut rng), None);
        let zeroed = vec![DropEntry {
            item: "scrap".to_string(),
            chance: 0.0,
        }];
        assert_eq!(roll_drop(&zeroed, &mut rng), None);
    }

    #[test]
    fn certain_drop_always_lands() {
        let mut rng = StdRng::seed_from_u64(7);
        let drops = vec![DropEntry {
            item: "scrap".to_string(),
            chance: 1.0,
        }];
        for _ in 0..32 {
            assert_eq!(roll_drop(&drops, &mut rng).as_deref(), Some("scrap"));
        }
    }

    #[test]
    fn at_most_one_item_per_roll_and_rates_converge() {
        let mut rng = StdRng::seed_from_u64(42);
        let drops = vec![
            DropEntry {
                item: "a".to_string(),
                chance: 0.3,
            },
            DropEntry {
                item: "b".to_string(),
                chance: 0.2,
            },
        ];
        let mut hits = 0u32;
        let trials = 20_000;
        for _ in 0..trials {
            if roll_drop(&drops, &mut rng).is_some() {
                hits += 1;
            }
        }
        let rate = f64::from(hits) / f64::from(trials);
        // combined window is 0.5 regardless of shuffle order
        assert!((rate - 0.5).abs() < 0.02, "drop rate {rate}");
    }

    #[test]
    fn negative_reward_tables_are_rejected() {
        let mut rewards = RewardTable::default();
        assert!(rewards_valid(&rewards));
        rewards.credits = -1;
        assert!(!rewards_valid(&rewards));
    }

    fn world_with_certain_drop(item: &str) -> crate::world::World {
        let (mut world, _clock) = crate::world::testutil::test_world();
        let mut npcs = (*world.registries.npcs).clone();
        npcs.insert(
            "Carrier".to_string(),
            stardrift_config::NpcTypeConfig {
                drops: vec![DropEntry {
                    item: item.to_string(),
                    chance: 1.0,
                }],
                ..Default::default()
            },
        );
        world.registries.npcs = std::sync::Arc::new(npcs);
        world
    }

    #[test]
    fn dropped_item_for_an_empty_slot_is_equipped() {
        let mut world = world_with_certain_drop("hull_plate_mk1");
        let _rx = crate::world::testutil::add_player(&mut world, 1);
        let now = world.now();

        grant(&mut world, 1, "Carrier", "op-1", "npc_9", now);

        let player = world.players.get(&1).unwrap();
        assert_eq!(player.items.len(), 1);
        assert_eq!(player.items[0].slot.as_deref(), Some("HULL"));
        // the fitted hull plate raises the derived cap right away
        assert_eq!(player.max_health, 110_000);
    }

    #[test]
    fn second_drop_for_an_occupied_slot_stays_in_cargo() {
        let mut world = world_with_certain_drop("hull_plate_mk1");
        let _rx = crate::world::testutil::add_player(&mut world, 1);
        let now = world.now();

        grant(&mut world, 1, "Carrier", "op-1", "npc_9", now);
        grant(&mut world, 1, "Carrier", "op-2", "npc_10", now);

        let player = world.players.get(&1).unwrap();
        assert_eq!(player.items.len(), 2);
        let equipped: Vec<_> = player.items.iter().filter(|i| i.slot.is_some()).collect();
        assert_eq!(equipped.len(), 1);
        assert_eq!(player.max_health, 110_000);
    }

    #[test]
    fn slotless_drops_are_never_equipped() {
        let mut world = world_with_certain_drop("salvage_scrap");
        let _rx = crate::world::testutil::add_player(&mut world, 1);
        let now = world.now();

        grant(&mut world, 1, "Carrier", "op-1", "npc_9", now);

        let player = world.players.get(&1).unwrap();
        assert_eq!(player.items[0].slot, None);
        assert_eq!(player.max_health, 100_000);
    }
}
