//! End-to-end scenarios driven through a real `World`: frames go in
//! through the router, outbound frames are captured from each client's
//! channel, and the shared clock is skewed to cross time windows.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use stardrift::crash::CrashReporter;
use stardrift::entity::{CargoBox, ProjectileOwner, TargetRef};
use stardrift::net::client::OutboundHandle;
use stardrift::persist::{MemoryPlayerStore, PlayerRow, SaveQueue};
use stardrift::systems::{ai, damage, projectile, reward};
use stardrift::world::{handlers, JoinContext, World};
use stardrift_config::{
    DropEntry, MapConfig, NpcTypeConfig, Registries, RewardTable, DEFAULT_SHIP,
};
use stardrift_core::math::Vector2;
use stardrift_core::time::GameClock;
use stardrift_protocol::codec;

const TICK_MS: u64 = 50;

struct Harness {
    world: World,
    clock: GameClock,
}

struct TestClient {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl TestClient {
    fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            if let Ok(text) = message.to_text() {
                if let Ok(value) = serde_json::from_str(text) {
                    frames.push(value);
                }
            }
        }
        frames
    }
}

fn of_type<'f>(frames: &'f [Value], message_type: &str) -> Vec<&'f Value> {
    frames
        .iter()
        .filter(|f| f["type"] == message_type)
        .collect()
}

fn test_registries() -> Registries {
    let mut registries = Registries::defaults();
    // one empty map so every entity in a test is placed deliberately
    registries.maps = Arc::new(vec![MapConfig {
        id: "testmap".to_string(),
        width: 21_000.0,
        height: 13_100.0,
        npcs: Vec::new(),
        hazards: Vec::new(),
    }]);
    // a deterministic target: fixed rewards, a guaranteed drop, no cargo
    let mut npcs: HashMap<String, NpcTypeConfig> = (*registries.npcs).clone();
    npcs.insert(
        "Drone".to_string(),
        NpcTypeConfig {
            health: 1_000,
            shield: 0,
            rewards: RewardTable {
                credits: 50,
                cosmos: 0,
                experience: 10,
                honor: 5,
            },
            drops: vec![DropEntry {
                item: "salvage_scrap".to_string(),
                chance: 1.0,
            }],
            cargo: stardrift_config::CargoDrop {
                chance: 0.0,
                ..Default::default()
            },
            ..NpcTypeConfig::default()
        },
    );
    registries.npcs = Arc::new(npcs);
    registries
}

fn harness() -> Harness {
    let registries = test_registries();
    let map_config = registries.maps[0].clone();
    let clock = GameClock::new();
    let world = World::new(
        map_config,
        registries,
        clock.clone(),
        SaveQueue::new(64),
        Arc::new(MemoryPlayerStore::default()),
        Arc::new(CrashReporter::new("/tmp/stardrift-test-reports")),
    );
    Harness { world, clock }
}

impl Harness {
    fn join(&mut self, client_id: u64, nickname: &str) -> TestClient {
        let (outbound, rx) = OutboundHandle::channel();
        let user_id = Uuid::new_v4();
        self.world.join(JoinContext {
            client_id,
            user_id,
            row: PlayerRow {
                db_id: client_id as i64,
                user_id,
                nickname: nickname.to_string(),
                ship: DEFAULT_SHIP.to_string(),
                map_id: None,
                upgrades: Default::default(),
                wallet: Default::default(),
                resources: Default::default(),
                items: Vec::new(),
                ship_skins: Default::default(),
                is_administrator: false,
            },
            recent_honor: 0.0,
            requested_position: None,
            outbound,
        });
        TestClient { rx }
    }

    fn frame(&mut self, client_id: u64, raw: Value) {
        let decoded = codec::decode(&raw.to_string(), 64 * 1024).expect("test frame decodes");
        handlers::handle_frame(&mut self.world, client_id, decoded);
    }

    /// Advance simulated time and run the tick pipeline.
    fn step(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.clock.advance(TICK_MS);
            self.world.tick_once();
        }
    }
}

// ── scenario 1: join, move, broadcast ───────────────────────────────

#[test]
fn join_then_move_is_visible_to_the_next_joiner() {
    let mut h = harness();
    let mut a = h.join(1, "A");

    let a_frames = a.drain();
    let welcome = of_type(&a_frames, "welcome")[0];
    assert_eq!(welcome["clientId"], 1);
    assert_eq!(welcome["initialState"]["maxHealth"], 100_000);
    assert!(of_type(&a_frames, "initial_npcs").len() == 1);

    h.frame(
        1,
        json!({
            "type": "position_update", "clientId": 1,
            "x": 120.0, "y": 0.0, "rotation": 0.0,
            "velocityX": 300.0, "velocityY": 0.0, "tick": 5
        }),
    );

    // B joins before the next tick and still sees A at x=120
    let mut b = h.join(2, "B");
    let b_frames = b.drain();
    let updates = of_type(&b_frames, "remote_player_update");
    let a_row = updates
        .iter()
        .find(|u| u["p"][0] == 1)
        .expect("B received A's state");
    assert_eq!(a_row["p"][1], 120.0);
    assert_eq!(a_row["p"][6], 5); // client tick echoed

    // A was told about B joining, not about itself
    let a_frames = a.drain();
    assert_eq!(of_type(&a_frames, "player_joined").len(), 1);
}

// ── scenario 2: npc kill, idempotent reward ─────────────────────────

#[test]
fn npc_kill_grants_once_and_suppresses_replays() {
    let mut h = harness();
    let mut p = h.join(1, "P");
    let now = h.world.now();
    let npc_id = h
        .world
        .spawn_npc_at("Drone", Vector2::new(100.0, 0.0), now)
        .unwrap();
    p.drain();

    let killed = damage::apply_to_npc(&mut h.world, &npc_id, 10_000, Some(1), now);
    assert!(killed);
    assert!(!h.world.npcs.contains(&npc_id));

    let player = h.world.players.get(&1).unwrap();
    assert_eq!(player.wallet.credits, 50);
    assert_eq!(player.wallet.experience, 10);
    assert_eq!(player.wallet.honor, 5);
    assert_eq!(player.wallet.cosmos, 0);
    assert_eq!(player.items.len(), 1, "exactly one drop at chance 1.0");

    let frames = p.drain();
    let updates = of_type(&frames, "player_state_update");
    assert_eq!(updates.len(), 1);
    let kill_op = updates[0]["rewardsEarned"]["killOpId"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(updates[0]["rewardsEarned"]["credits"], 50);
    assert!(!of_type(&frames, "entity_destroyed").is_empty());

    // replaying the same kill op mutates nothing
    reward::grant(&mut h.world, 1, "Drone", &kill_op, &npc_id, now);
    let player = h.world.players.get(&1).unwrap();
    assert_eq!(player.wallet.credits, 50);
    assert_eq!(player.items.len(), 1);
    let frames = p.drain();
    assert!(of_type(&frames, "player_state_update").is_empty());
    assert!(h
        .world
        .crash
        .recent_global()
        .iter()
        .any(|e| e.kind == "loot_duplicate_suppressed"));
}

// ── scenario 3: combat session guard ────────────────────────────────

#[test]
fn second_start_combat_is_rejected() {
    let mut h = harness();
    let mut p = h.join(1, "P");
    let now = h.world.now();
    let npc_a = h
        .world
        .spawn_npc_at("Scouter", Vector2::new(200.0, 0.0), now)
        .unwrap();
    let npc_b = h
        .world
        .spawn_npc_at("Scouter", Vector2::new(-200.0, 0.0), now)
        .unwrap();
    p.drain();

    h.frame(
        1,
        json!({"type": "start_combat", "clientId": 1, "playerId": 1, "npcId": npc_a}),
    );
    let frames = p.drain();
    let update = of_type(&frames, "combat_update")[0];
    assert_eq!(update["isAttacking"], true);
    assert_eq!(update["npcId"], npc_a.as_str());
    // the opening shot went out immediately
    assert_eq!(of_type(&frames, "projectile_fired").len(), 1);

    h.frame(
        1,
        json!({"type": "start_combat", "clientId": 1, "playerId": 1, "npcId": npc_b}),
    );
    let frames = p.drain();
    let error = of_type(&frames, "combat_error")[0];
    assert_eq!(error["code"], "MULTIPLE_COMBAT_SESSIONS");
    assert!(error["activeSessionId"].is_string());
    assert_eq!(h.world.sessions.get(&1).unwrap().target_id, npc_a);
}

#[test]
fn start_combat_against_missing_npc_errors() {
    let mut h = harness();
    let mut p = h.join(1, "P");
    p.drain();
    h.frame(
        1,
        json!({"type": "start_combat", "clientId": 1, "playerId": 1, "npcId": "npc_404"}),
    );
    let frames = p.drain();
    assert_eq!(of_type(&frames, "combat_error")[0]["code"], "NPC_NOT_FOUND");
}

// ── scenario 4: cargo exclusivity window ────────────────────────────

#[test]
fn cargo_box_respects_the_killer_window() {
    let mut h = harness();
    let mut p1 = h.join(1, "Killer");
    let mut p2 = h.join(2, "Scavenger");
    h.world.players.get_mut(&2).unwrap().pos = Vector2::new(120.0, 100.0);

    let now = h.world.now();
    let box_id = h
        .world
        .cargo_boxes
        .spawn(|id| CargoBox {
            id,
            pos: Vector2::new(100.0, 100.0),
            resource_type: "prometium".to_string(),
            quantity: 4,
            npc_type: "Scouter".to_string(),
            killer_id: Some(1),
            spawned_at: now,
            expires_at: now + 60_000,
            exclusive_until: now + 10_000,
        })
        .id
        .clone();
    p1.drain();
    p2.drain();

    h.frame(2, json!({"type": "cargo_box_collect", "clientId": 2, "boxId": box_id}));
    let frames = p2.drain();
    let status = of_type(&frames, "cargo_box_collect_status")[0];
    assert_eq!(status["status"], "cancelled");
    assert_eq!(status["reason"], "BOX_EXCLUSIVE");

    // one millisecond past the window the same request channels
    h.clock.advance(10_001);
    h.frame(2, json!({"type": "cargo_box_collect", "clientId": 2, "boxId": box_id}));
    let frames = p2.drain();
    assert_eq!(of_type(&frames, "cargo_box_collect_status")[0]["status"], "started");

    // ride the channel to completion (1800 ms of ticks)
    h.step(40);
    let frames = p2.drain();
    let done = of_type(&frames, "cargo_box_collect_status");
    assert!(done.iter().any(|s| s["status"] == "collected"));
    assert_eq!(
        h.world.players.get(&2).unwrap().resources.get("prometium"),
        Some(&4)
    );
    assert!(!h.world.cargo_boxes.contains(&box_id));
    let p1_frames = p1.drain();
    assert!(of_type(&p1_frames, "cargo_box_removed")
        .iter()
        .any(|r| r["reason"] == "collected"));
}

#[test]
fn drifting_player_loses_the_channel() {
    let mut h = harness();
    let mut p = h.join(1, "P");
    let now = h.world.now();
    let box_id = h
        .world
        .cargo_boxes
        .spawn(|id| CargoBox {
            id,
            pos: Vector2::ZERO,
            resource_type: "endurium".to_string(),
            quantity: 2,
            npc_type: "Scouter".to_string(),
            killer_id: Some(1),
            spawned_at: now,
            expires_at: now + 60_000,
            exclusive_until: now,
        })
        .id
        .clone();
    p.drain();

    h.frame(1, json!({"type": "cargo_box_collect", "clientId": 1, "boxId": box_id}));
    h.step(5); // anchor set, channel running
    h.world.players.get_mut(&1).unwrap().pos = Vector2::new(40.0, 0.0); // > 26 px drift
    h.step(1);
    let frames = p.drain();
    let cancelled = of_type(&frames, "cargo_box_collect_status")
        .into_iter()
        .find(|s| s["status"] == "cancelled")
        .expect("channel cancelled");
    assert_eq!(cancelled["reason"], "INVALID_PLAYER_POSITION");
    assert!(h.world.cargo_boxes.contains(&box_id));
}

// ── scenario 5: homing projectile orphan ────────────────────────────

#[test]
fn orphaned_homing_projectile_is_removed_without_damage() {
    let mut h = harness();
    let mut p = h.join(1, "P");
    let now = h.world.now();
    let npc_id = h
        .world
        .spawn_npc_at("Scouter", Vector2::new(900.0, 0.0), now)
        .unwrap();
    projectile::spawn_homing(
        &mut h.world,
        ProjectileOwner::Player(1),
        Vector2::ZERO,
        TargetRef::Npc(npc_id.clone()),
        500,
        1_200.0,
        "laser".to_string(),
        now,
    );
    assert_eq!(h.world.projectiles.len(), 1);
    p.drain();

    h.world.npcs.remove(&npc_id);
    h.step(1);

    assert_eq!(h.world.projectiles.len(), 0);
    let frames = p.drain();
    let destroyed = of_type(&frames, "projectile_destroyed")[0];
    assert_eq!(destroyed["reason"], "orphaned");
    assert!(of_type(&frames, "entity_damaged").is_empty());
}

// ── boundary behaviors ──────────────────────────────────────────────

#[test]
fn npc_reflects_off_the_world_edge() {
    let mut h = harness();
    let now = h.world.now();
    let half_w = h.world.config.half_width();
    let npc_id = h
        .world
        .spawn_npc_at("Scouter", Vector2::new(half_w, 0.0), now)
        .unwrap();
    {
        let npc = h.world.npcs.get_mut(&npc_id).unwrap();
        npc.vel = Vector2::new(300.0, 0.0);
    }
    ai::tick(&mut h.world, now + TICK_MS, 0.05);
    let npc = h.world.npcs.get(&npc_id).unwrap();
    assert!(npc.vel.x < 0.0, "vx must flip, got {}", npc.vel.x);
    assert!(npc.pos.x <= half_w);
}

#[test]
fn far_out_projectile_is_culled() {
    let mut h = harness();
    let now = h.world.now();
    projectile::spawn_free(
        &mut h.world,
        ProjectileOwner::Player(1),
        Vector2::new(24_990.0, 0.0),
        Vector2::new(1_000.0, 0.0),
        100,
        "laser".to_string(),
        now,
    );
    h.step(1);
    assert_eq!(h.world.projectiles.len(), 0);
}

// ── supplements: heartbeat, skill upgrade, chat, respawn ────────────

#[test]
fn heartbeat_is_acknowledged_with_the_echoed_timestamp() {
    let mut h = harness();
    let mut p = h.join(1, "P");
    p.drain();
    h.frame(1, json!({"type": "heartbeat", "clientId": 1, "timestamp": 777}));
    let frames = p.drain();
    assert_eq!(of_type(&frames, "heartbeat_ack")[0]["timestamp"], 777);
}

#[test]
fn skill_upgrade_spends_a_point_and_rescales_vitals() {
    let mut h = harness();
    let mut p = h.join(1, "P");
    h.world.players.get_mut(&1).unwrap().wallet.skill_points = 2;
    p.drain();

    h.frame(
        1,
        json!({"type": "skill_upgrade_request", "clientId": 1, "playerId": 1, "upgradeType": "hp"}),
    );
    let frames = p.drain();
    let update = of_type(&frames, "player_state_update")[0];
    assert_eq!(update["source"], "skill_upgrade");
    assert_eq!(update["upgrades"]["hp"], 1);
    assert_eq!(update["inventory"]["skillPoints"], 1);
    assert_eq!(h.world.players.get(&1).unwrap().max_health, 105_000);

    // drain the wallet, then the next request is refused
    h.world.players.get_mut(&1).unwrap().wallet.skill_points = 0;
    h.frame(
        1,
        json!({"type": "skill_upgrade_request", "clientId": 1, "playerId": 1, "upgradeType": "hp"}),
    );
    let frames = p.drain();
    assert_eq!(of_type(&frames, "error")[0]["code"], "VALIDATION_FAILED");
}

#[test]
fn chat_reaches_the_map_sanitized() {
    let mut h = harness();
    let mut a = h.join(1, "A");
    let mut b = h.join(2, "B");
    a.drain();
    b.drain();

    h.frame(
        1,
        json!({"type": "chat_message", "clientId": 1, "content": "  hello <b>space</b>  "}),
    );
    let frames = b.drain();
    let chat = of_type(&frames, "chat_message")[0];
    assert_eq!(chat["content"], "hello space");
    assert_eq!(chat["nickname"], "A");
    // sender gets the echo too
    assert_eq!(of_type(&a.drain(), "chat_message").len(), 1);
}

#[test]
fn dead_player_respawns_at_the_map_center_with_full_vitals() {
    let mut h = harness();
    let mut p = h.join(1, "P");
    {
        let player = h.world.players.get_mut(&1).unwrap();
        player.pos = Vector2::new(3_000.0, -500.0);
    }
    let now = h.world.now();
    let killed = damage::apply_to_player(&mut h.world, 1, 10_000_000, None, now);
    assert!(killed);
    assert!(h.world.players.get(&1).unwrap().is_dead);
    p.drain();

    h.frame(1, json!({"type": "respawn_request", "clientId": 1}));
    let frames = p.drain();
    let respawned = of_type(&frames, "player_respawned")[0];
    assert_eq!(respawned["position"]["x"], 0.0);
    let player = h.world.players.get(&1).unwrap();
    assert!(!player.is_dead);
    assert_eq!(player.health, player.max_health);
    assert_eq!(player.shield, player.max_shield);
}

// ── ordering & identity ─────────────────────────────────────────────

#[test]
fn frames_claiming_a_foreign_client_id_are_dropped() {
    let mut h = harness();
    let mut a = h.join(1, "A");
    let mut b = h.join(2, "B");
    a.drain();
    b.drain();

    // client 2 claims to be client 1
    h.frame(
        2,
        json!({
            "type": "position_update", "clientId": 1,
            "x": 9_999.0, "y": 0.0, "rotation": 0.0,
            "velocityX": 0.0, "velocityY": 0.0, "tick": 1
        }),
    );
    h.step(1);
    assert_eq!(h.world.players.get(&2).unwrap().pos, Vector2::ZERO);
    assert_eq!(h.world.players.get(&1).unwrap().pos, Vector2::ZERO);
}

#[test]
fn out_of_bounds_position_is_clamped_and_acked() {
    let mut h = harness();
    let mut p = h.join(1, "P");
    p.drain();
    let half_w = h.world.config.half_width();

    h.frame(
        1,
        json!({
            "type": "position_update", "clientId": 1,
            "x": half_w + 5_000.0, "y": 0.0, "rotation": 0.0,
            "velocityX": 0.0, "velocityY": 0.0, "tick": 9
        }),
    );
    h.step(1);
    let player = h.world.players.get(&1).unwrap();
    assert_eq!(player.pos.x, half_w);
    let frames = p.drain();
    let ack = of_type(&frames, "position_ack")[0];
    assert_eq!(ack["accepted"], false);
    assert_eq!(ack["x"], half_w);
    assert_eq!(ack["tick"], 9);
}

#[test]
fn inputs_from_one_client_apply_in_order() {
    let mut h = harness();
    let _p = h.join(1, "P");
    for (i, x) in [10.0, 20.0, 30.0].iter().enumerate() {
        h.frame(
            1,
            json!({
                "type": "position_update", "clientId": 1,
                "x": x, "y": 0.0, "rotation": 0.0,
                "velocityX": 0.0, "velocityY": 0.0, "tick": i as u64
            }),
        );
    }
    h.step(1);
    let player = h.world.players.get(&1).unwrap();
    assert_eq!(player.pos.x, 30.0);
    assert_eq!(player.last_client_tick, 2);
}
