//! Per-map simulation actor. Each map is a single task that drains
//! its inbox at the start of every tick, runs the systems in a fixed
//! order, and broadcasts from inside the tick. Nothing outside the
//! task ever touches map state.

pub mod broadcast;
pub mod clock;
pub mod handlers;
pub mod spatial;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stardrift_config::{MapConfig, Registries};
use stardrift_core::math::{clamp_to_extent, Vector2};
use stardrift_core::ring::RecentOps;
use stardrift_core::time::GameClock;
use tokio::sync::mpsc;
use uuid::Uuid;

use stardrift_protocol::client::{
    CInitialNpcs, CNpcBulkUpdate, CPlayerJoined, CPositionAck, CRemotePlayerUpdate, CWelcome,
    ClientMessage, InitialState,
};
use stardrift_protocol::server::Serverbound;
use stardrift_protocol::{WirePose, WireShipSkins};

use crate::crash::CrashReporter;
use crate::entity::player::{rank_for_honor, RECENT_OPS_CAPACITY};
use crate::entity::{CargoBox, Npc, Player, Projectile};
use crate::net::client::OutboundHandle;
use crate::persist::{PlayerRow, PlayerStore, SaveQueue};
use crate::systems::cargo::CargoCollection;
use crate::systems::combat::CombatSession;
use crate::systems::damage::{BreadcrumbObserver, DeathObserver};
use crate::systems::respawn::{CenterRespawn, PendingNpcRespawn, RespawnPolicy};
use crate::systems::{self, cargo};

use clock::TickClock;
use spatial::{ScanSpatial, SpatialQuery};
use store::EntityStore;

/// Commands posted to a map's inbox by connection tasks. Drained FIFO
/// at the start of each tick, which is what gives per-connection
/// ordering.
pub enum MapCommand {
    Join(Box<JoinContext>),
    Frame {
        client_id: u64,
        message: Serverbound,
    },
    Disconnect {
        client_id: u64,
    },
    Shutdown,
}

/// Everything the session layer resolved before handing the player to
/// the map: verified identity, loaded row, cached honor.
pub struct JoinContext {
    pub client_id: u64,
    pub user_id: Uuid,
    pub row: PlayerRow,
    pub recent_honor: f64,
    pub requested_position: Option<WirePose>,
    pub outbound: OutboundHandle,
}

#[derive(Clone)]
pub struct MapHandle {
    pub map_id: String,
    tx: mpsc::UnboundedSender<MapCommand>,
}

impl MapHandle {
    pub fn send(&self, command: MapCommand) {
        if self.tx.send(command).is_err() {
            log::error!("map {} inbox is gone", self.map_id);
        }
    }

    pub fn frame(&self, client_id: u64, message: Serverbound) {
        self.send(MapCommand::Frame { client_id, message });
    }

    pub fn disconnect(&self, client_id: u64) {
        self.send(MapCommand::Disconnect { client_id });
    }

    pub fn shutdown(&self) {
        self.send(MapCommand::Shutdown);
    }
}

pub struct World {
    pub map_id: String,
    pub config: MapConfig,
    pub registries: Registries,
    pub clock: GameClock,
    pub tick: u64,

    pub players: HashMap<u64, Player>,
    pub npcs: EntityStore<Npc>,
    pub projectiles: EntityStore<Projectile>,
    pub cargo_boxes: EntityStore<CargoBox>,

    pub sessions: HashMap<u64, CombatSession>,
    pub next_session_id: u64,
    pub collections: HashMap<u64, CargoCollection>,
    pub respawn_queue: Vec<PendingNpcRespawn>,

    pub spatial: Box<dyn SpatialQuery>,
    pub respawn_policy: Box<dyn RespawnPolicy>,
    pub saves: SaveQueue,
    pub store: Arc<dyn PlayerStore>,
    pub crash: Arc<CrashReporter>,
    pub death_observers: Vec<Box<dyn DeathObserver>>,

    last_hazard_at: u64,
    last_respawn_sweep_at: u64,
    last_autosave_at: u64,
}

impl World {
    pub fn new(
        config: MapConfig,
        registries: Registries,
        clock: GameClock,
        saves: SaveQueue,
        store: Arc<dyn PlayerStore>,
        crash: Arc<CrashReporter>,
    ) -> Self {
        let breadcrumbs = BreadcrumbObserver::new(crash.clone());
        let mut world = Self {
            map_id: config.id.clone(),
            config,
            registries,
            clock,
            tick: 0,
            players: HashMap::new(),
            npcs: EntityStore::new("npc"),
            projectiles: EntityStore::new("proj"),
            cargo_boxes: EntityStore::new("box"),
            sessions: HashMap::new(),
            next_session_id: 0,
            collections: HashMap::new(),
            respawn_queue: Vec::new(),
            spatial: Box::new(ScanSpatial),
            respawn_policy: Box::new(CenterRespawn),
            saves,
            store,
            crash,
            death_observers: vec![Box::new(breadcrumbs)],
            last_hazard_at: 0,
            last_respawn_sweep_at: 0,
            last_autosave_at: 0,
        };
        world.spawn_initial_npcs();
        world
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.registries.server.tick_interval_ms())
    }

    fn dt_secs(&self) -> f64 {
        self.registries.server.tick_interval_ms() as f64 / 1000.0
    }

    pub fn broadcast<M: ClientMessage>(&self, message: &M, exclude: Option<u64>) {
        broadcast::to_map(self.players.values(), message, exclude);
    }

    pub fn broadcast_near<M: ClientMessage>(
        &self,
        center: Vector2,
        radius: f64,
        message: &M,
        exclude: Option<u64>,
    ) {
        broadcast::near(self.players.values(), center, radius, message, exclude);
    }

    pub fn send_to<M: ClientMessage>(&self, client_id: u64, message: &M) {
        if let Some(player) = self.players.get(&client_id) {
            player.outbound.send(message);
        }
    }

    pub fn clamp_to_bounds(&self, pos: Vector2) -> Vector2 {
        Vector2::new(
            clamp_to_extent(pos.x, self.config.half_width()),
            clamp_to_extent(pos.y, self.config.half_height()),
        )
    }

    pub fn in_bounds(&self, pos: Vector2) -> bool {
        pos.x.is_finite()
            && pos.y.is_finite()
            && pos.x.abs() <= self.config.half_width()
            && pos.y.abs() <= self.config.half_height()
    }

    fn spawn_initial_npcs(&mut self) {
        let now = self.now();
        let populations = self.config.npcs.clone();
        for population in populations {
            for _ in 0..population.count {
                let pos = self.random_position();
                self.spawn_npc_at(&population.kind, pos, now);
            }
        }
    }

    pub fn random_position(&self) -> Vector2 {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Vector2::new(
            rng.gen_range(-self.config.half_width()..=self.config.half_width()),
            rng.gen_range(-self.config.half_height()..=self.config.half_height()),
        )
    }

    /// Spawn one NPC of `kind`. Unknown kinds are a config bug: logged
    /// and skipped, never fatal.
    pub fn spawn_npc_at(&mut self, kind: &str, pos: Vector2, now: u64) -> Option<String> {
        let Some(config) = self.registries.npcs.get(kind).cloned() else {
            log::warn!("map {}: unknown npc type {kind}", self.map_id);
            return None;
        };
        let npc = self
            .npcs
            .spawn(|id| Npc::spawn(id, kind, &config, pos, now));
        Some(npc.id.clone())
    }

    /// Install the player and bring the new client up to date: welcome,
    /// the NPC snapshot, every existing player, every live cargo box.
    pub fn join(&mut self, ctx: JoinContext) {
        let now = self.now();
        let ship = self.registries.ship(&ctx.row.ship).clone();
        let requested = ctx
            .requested_position
            .map(|pose| Vector2::new(pose.x, pose.y))
            .unwrap_or(Vector2::ZERO);
        let rotation = ctx.requested_position.map(|p| p.rotation).unwrap_or(0.0);

        let mut player = Player {
            client_id: ctx.client_id,
            user_id: ctx.user_id,
            db_id: ctx.row.db_id,
            nickname: ctx.row.nickname.clone(),
            ship: ctx.row.ship.clone(),
            pos: self.clamp_to_bounds(requested),
            rotation,
            vel: Vector2::ZERO,
            health: 0,
            shield: 0,
            max_health: 0,
            max_shield: 0,
            upgrades: ctx.row.upgrades,
            wallet: ctx.row.wallet,
            resources: ctx.row.resources.clone(),
            items: ctx.row.items.clone(),
            ship_skins: ctx.row.ship_skins.clone(),
            is_dead: false,
            is_administrator: ctx.row.is_administrator,
            is_migrating: false,
            rank: rank_for_honor(ctx.row.wallet.honor),
            podium: 0,
            recent_honor: ctx.recent_honor,
            last_input_at: now,
            last_damage: 0,
            last_combat_stop: 0,
            last_client_tick: 0,
            recent_ops: RecentOps::new(RECENT_OPS_CAPACITY),
            position_inputs: Default::default(),
            outbound: ctx.outbound,
        };
        player.recompute_derived(&ship, &self.registries.items);
        player.health = player.max_health;
        player.shield = player.max_shield;

        let joined = CPlayerJoined {
            client_id: player.client_id,
            nickname: player.nickname.clone(),
            position: WirePose {
                x: player.pos.x,
                y: player.pos.y,
                rotation: player.rotation,
            },
            health: player.health,
            max_health: player.max_health,
            shield: player.shield,
            max_shield: player.max_shield,
            rank: player.rank,
        };
        self.broadcast(&joined, None);

        let welcome = CWelcome {
            client_id: player.client_id,
            player_id: player.user_id.to_string(),
            player_db_id: player.db_id,
            map_id: self.map_id.clone(),
            message: format!("Welcome to {}", self.map_id),
            initial_state: InitialState {
                position: WirePose {
                    x: player.pos.x,
                    y: player.pos.y,
                    rotation: player.rotation,
                },
                health: player.health,
                max_health: player.max_health,
                shield: player.shield,
                max_shield: player.max_shield,
                is_administrator: player.is_administrator,
                rank: player.rank,
                leaderboard_podium_rank: player.podium,
                ship_skins: WireShipSkins {
                    selected_skin_id: player.ship_skins.selected_skin_id.clone(),
                    unlocked_skin_ids: player.ship_skins.unlocked_skin_ids.clone(),
                },
                recent_honor: player.recent_honor,
            },
        };
        player.outbound.send(&welcome);

        let snapshot = CInitialNpcs {
            n: self.npcs.values().map(Npc::state).collect(),
            t: self.clock.now_wall(),
        };
        player.outbound.send(&snapshot);

        for other in self.players.values() {
            player.outbound.send(&CRemotePlayerUpdate {
                p: other.remote_state(),
                t: self.clock.now_wall(),
            });
        }
        for cargo_box in self.cargo_boxes.values() {
            player.outbound.send(&cargo::spawned_message(self, cargo_box));
        }

        log::info!(
            "map {}: {} joined as client {}",
            self.map_id,
            player.nickname,
            player.client_id
        );
        self.crash
            .record(Some(player.client_id), "join", self.map_id.clone());
        self.players.insert(player.client_id, player);
    }

    /// Tear a player down: cancel channelled actions, stop combat,
    /// persist, tell the map. Runs for clean closes and socket errors
    /// alike.
    pub fn disconnect(&mut self, client_id: u64) {
        let now = self.now();
        systems::cargo::cancel_collection(self, client_id, None, now);
        systems::combat::stop(self, client_id, now, false);
        for npc in self.npcs.values_mut() {
            if npc.last_attacker == Some(client_id) {
                npc.last_attacker = None;
            }
        }
        let Some(player) = self.players.remove(&client_id) else {
            return;
        };
        self.saves.enqueue(self.player_row(&player), "disconnect");
        self.broadcast(
            &stardrift_protocol::client::CPlayerLeft { client_id },
            None,
        );
        log::info!(
            "map {}: {} (client {client_id}) left",
            self.map_id,
            player.nickname
        );
        self.crash.record(Some(client_id), "disconnect", "");
    }

    pub fn player_row(&self, player: &Player) -> PlayerRow {
        PlayerRow {
            db_id: player.db_id,
            user_id: player.user_id,
            nickname: player.nickname.clone(),
            ship: player.ship.clone(),
            map_id: Some(self.map_id.clone()),
            upgrades: player.upgrades,
            wallet: player.wallet,
            resources: player.resources.clone(),
            items: player.items.clone(),
            ship_skins: player.ship_skins.clone(),
            is_administrator: player.is_administrator,
        }
    }

    pub fn enqueue_save(&self, client_id: u64, reason: &str) {
        if let Some(player) = self.players.get(&client_id) {
            self.saves.enqueue(self.player_row(player), reason);
        }
    }

    /// One 50 ms simulation step. Ordering is load-bearing: inputs were
    /// drained before this runs, AI moves NPCs, combat fires, physics
    /// advances projectiles into fresh positions, damage resolution
    /// happened inside those systems, then deltas go out.
    pub fn tick_once(&mut self) {
        let now = self.now();
        let dt = self.dt_secs();
        self.tick += 1;

        self.apply_position_inputs(now);
        systems::ai::tick(self, now, dt);
        systems::combat::tick(self, now);
        systems::projectile::tick(self, now, dt);
        systems::hazard::tick(self, now);
        systems::cargo::tick(self, now);
        systems::respawn::tick(self, now);
        self.broadcast_npc_bulk();
        self.autosave(now);
    }

    fn apply_position_inputs(&mut self, now: u64) {
        let half_w = self.config.half_width();
        let half_h = self.config.half_height();
        for player in self.players.values_mut() {
            while let Some(input) = player.position_inputs.pop_front() {
                if player.is_dead {
                    continue;
                }
                player.pos = Vector2::new(
                    clamp_to_extent(input.pos.x, half_w),
                    clamp_to_extent(input.pos.y, half_h),
                );
                player.rotation = input.rotation;
                player.vel = input.vel;
                player.last_client_tick = input.tick;
                player.last_input_at = now;
                if !input.in_bounds {
                    player.outbound.send(&CPositionAck {
                        tick: input.tick,
                        x: player.pos.x,
                        y: player.pos.y,
                        accepted: false,
                    });
                }
            }
        }
    }

    fn broadcast_npc_bulk(&mut self) {
        let mut rows = Vec::new();
        for npc in self.npcs.values_mut() {
            if npc.needs_broadcast() {
                rows.push(npc.delta());
                npc.mark_broadcast();
            }
        }
        if rows.is_empty() {
            return;
        }
        let update = CNpcBulkUpdate {
            n: rows,
            t: self.clock.now_wall(),
        };
        self.broadcast(&update, None);
    }

    fn autosave(&mut self, now: u64) {
        let interval = self.registries.server.save_interval_ms;
        if now.saturating_sub(self.last_autosave_at) < interval {
            return;
        }
        self.last_autosave_at = now;
        for player in self.players.values() {
            self.saves.enqueue(self.player_row(player), "autosave");
        }
        if !self.players.is_empty() {
            log::debug!(
                "map {}: autosaved {} players",
                self.map_id,
                self.players.len()
            );
        }
    }

    fn flush_for_shutdown(&mut self) {
        for player in self.players.values() {
            self.saves.enqueue(self.player_row(player), "shutdown");
        }
        log::info!("map {} shutting down", self.map_id);
    }

    pub(crate) fn hazard_due(&mut self, now: u64) -> bool {
        if now.saturating_sub(self.last_hazard_at) >= 1_000 {
            self.last_hazard_at = now;
            true
        } else {
            false
        }
    }

    pub(crate) fn respawn_sweep_due(&mut self, now: u64) -> bool {
        if now.saturating_sub(self.last_respawn_sweep_at) >= 1_000 {
            self.last_respawn_sweep_at = now;
            true
        } else {
            false
        }
    }
}

/// Spawn a map as its own actor task and hand back its inbox.
pub fn spawn_map(
    config: MapConfig,
    registries: Registries,
    clock: GameClock,
    saves: SaveQueue,
    store: Arc<dyn PlayerStore>,
    crash: Arc<CrashReporter>,
) -> MapHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = MapHandle {
        map_id: config.id.clone(),
        tx,
    };
    let world = World::new(config, registries, clock, saves, store, crash);
    tokio::spawn(run_map(world, rx));
    handle
}


pub async fn run_map(mut world: World, mut inbox: mpsc::UnboundedReceiver<MapCommand>) {
    let mut clock = TickClock::new(world.tick_interval());
    log::info!(
        "map {} running at {} Hz with {} npcs",
        world.map_id,
        world.registries.server.tick_rate,
        world.npcs.len()
    );
    loop {
        clock.tick().await;
        loop {
            match inbox.try_recv() {
                Ok(MapCommand::Join(ctx)) => world.join(*ctx),
                Ok(MapCommand::Frame { client_id, message }) => {
                    handlers::handle_frame(&mut world, client_id, message);
                }
                Ok(MapCommand::Disconnect { client_id }) => world.disconnect(client_id),
                Ok(MapCommand::Shutdown) => {
                    world.flush_for_shutdown();
                    return;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    world.flush_for_shutdown();
                    return;
                }
            }
        }
        world.tick_once();
    }
}
