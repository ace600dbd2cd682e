use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use stardrift_config::{ItemConfig, ShipConfig};
use stardrift_core::math::Vector2;
use stardrift_core::ring::RecentOps;
use stardrift_protocol::client::RemotePlayerState;
use stardrift_protocol::{WireInventory, WireItem, WireShipSkins, WireUpgrades};
use uuid::Uuid;

use crate::net::client::OutboundHandle;

/// How many kill op ids each player remembers for reward idempotency.
pub const RECENT_OPS_CAPACITY: usize = 300;
/// Queued position inputs per player; older entries are dropped first.
pub const POSITION_QUEUE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub hp: u32,
    pub shield: u32,
    pub speed: u32,
    pub damage: u32,
}

impl Upgrades {
    pub fn wire(&self) -> WireUpgrades {
        WireUpgrades {
            hp: self.hp,
            shield: self.shield,
            speed: self.speed,
            damage: self.damage,
        }
    }
}

/// Currency wallet. Values are clamped non-negative after every
/// mutation; the wire form is a straight copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub credits: i64,
    pub cosmos: i64,
    pub experience: i64,
    pub honor: i64,
    pub skill_points: i64,
    pub skill_points_total: i64,
}

impl Wallet {
    pub fn clamp_non_negative(&mut self) {
        self.credits = self.credits.max(0);
        self.cosmos = self.cosmos.max(0);
        self.experience = self.experience.max(0);
        self.honor = self.honor.max(0);
        self.skill_points = self.skill_points.max(0);
        self.skill_points_total = self.skill_points_total.max(0);
    }

    pub fn wire(&self) -> WireInventory {
        WireInventory {
            credits: self.credits,
            cosmos: self.cosmos,
            experience: self.experience,
            honor: self.honor,
            skill_points: self.skill_points,
            skill_points_total: self.skill_points_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub id: String,
    pub instance_id: String,
    pub acquired_at: u64,
    pub slot: Option<String>,
}

impl OwnedItem {
    pub fn wire(&self) -> WireItem {
        WireItem {
            id: self.id.clone(),
            instance_id: self.instance_id.clone(),
            acquired_at: self.acquired_at,
            slot: self.slot.clone(),
        }
    }
}

/// Honor thresholds for the rank ladder. Rank is cosmetic; the ladder
/// itself is short and fixed.
const RANK_THRESHOLDS: [i64; 8] = [0, 100, 500, 2_000, 8_000, 25_000, 80_000, 250_000];

pub fn rank_for_honor(honor: i64) -> u32 {
    let reached = RANK_THRESHOLDS
        .iter()
        .take_while(|threshold| honor >= **threshold)
        .count() as u32;
    reached.saturating_sub(1)
}

/// A position input waiting for the tick loop.
#[derive(Debug, Clone, Copy)]
pub struct PositionInput {
    pub pos: Vector2,
    pub rotation: f64,
    pub vel: Vector2,
    pub tick: u64,
    pub in_bounds: bool,
}

/// One connected player, exclusively owned by its map's tick task.
pub struct Player {
    pub client_id: u64,
    pub user_id: Uuid,
    pub db_id: i64,
    pub nickname: String,
    pub ship: String,

    pub pos: Vector2,
    pub rotation: f64,
    pub vel: Vector2,

    pub health: i64,
    pub shield: i64,
    pub max_health: i64,
    pub max_shield: i64,

    pub upgrades: Upgrades,
    pub wallet: Wallet,
    pub resources: HashMap<String, i64>,
    pub items: Vec<OwnedItem>,
    pub ship_skins: WireShipSkins,

    pub is_dead: bool,
    pub is_administrator: bool,
    pub is_migrating: bool,

    pub rank: u32,
    pub podium: u32,
    pub recent_honor: f64,

    pub last_input_at: u64,
    pub last_damage: u64,
    pub last_combat_stop: u64,
    pub last_client_tick: u64,

    pub recent_ops: RecentOps,
    pub position_inputs: VecDeque<PositionInput>,

    pub outbound: OutboundHandle,
}

impl Player {
    /// Derived vitals:
    /// `max = floor(base * (1 + per_level_bonus * levels + sum(equipped bonuses)))`.
    /// Current health/shield are clamped into the new range.
    pub fn recompute_derived(&mut self, ship: &ShipConfig, items: &HashMap<String, ItemConfig>) {
        let mut hp_item_bonus = 0.0;
        let mut shield_item_bonus = 0.0;
        for owned in &self.items {
            if owned.slot.is_none() {
                continue;
            }
            if let Some(cfg) = items.get(&owned.id) {
                hp_item_bonus += cfg.hp_bonus;
                shield_item_bonus += cfg.shield_bonus;
            }
        }
        let hp_scale = 1.0 + ship.hp_upgrade_bonus * f64::from(self.upgrades.hp) + hp_item_bonus;
        let shield_scale =
            1.0 + ship.shield_upgrade_bonus * f64::from(self.upgrades.shield) + shield_item_bonus;
        self.max_health = (ship.health as f64 * hp_scale).floor() as i64;
        self.max_shield = (ship.shield as f64 * shield_scale).floor() as i64;
        self.health = self.health.clamp(0, self.max_health);
        self.shield = self.shield.clamp(0, self.max_shield);
    }

    pub fn effective_damage(&self, ship: &ShipConfig) -> i64 {
        let scale = 1.0 + ship.damage_upgrade_bonus * f64::from(self.upgrades.damage);
        (ship.base_damage as f64 * scale).floor() as i64
    }

    pub fn effective_speed(&self, ship: &ShipConfig) -> f64 {
        ship.speed * (1.0 + ship.speed_upgrade_bonus * f64::from(self.upgrades.speed))
    }

    /// Equip an owned item into its configured slot, unequipping any
    /// previous holder of that slot. Returns false for unequippable or
    /// unowned items.
    pub fn equip(&mut self, instance_id: &str, items: &HashMap<String, ItemConfig>) -> bool {
        let Some(idx) = self
            .items
            .iter()
            .position(|item| item.instance_id == instance_id)
        else {
            return false;
        };
        let Some(slot) = items.get(&self.items[idx].id).and_then(|cfg| cfg.slot.clone()) else {
            return false;
        };
        for item in &mut self.items {
            if item.slot.as_deref() == Some(slot.as_str()) {
                item.slot = None;
            }
        }
        self.items[idx].slot = Some(slot);
        true
    }

    /// Pose the rest of the map should see right now: the newest queued
    /// input if one is pending, otherwise the authoritative fields.
    pub fn effective_pose(&self) -> (Vector2, f64, Vector2, u64) {
        match self.position_inputs.back() {
            Some(input) => (input.pos, input.rotation, input.vel, input.tick),
            None => (self.pos, self.rotation, self.vel, self.last_client_tick),
        }
    }

    pub fn queue_position_input(&mut self, input: PositionInput) {
        while self.position_inputs.len() >= POSITION_QUEUE_LIMIT {
            self.position_inputs.pop_front();
        }
        self.position_inputs.push_back(input);
    }

    pub fn remote_state(&self) -> RemotePlayerState {
        let (pos, rotation, vel, tick) = self.effective_pose();
        RemotePlayerState {
            client_id: self.client_id,
            x: pos.x,
            y: pos.y,
            velocity_x: vel.x,
            velocity_y: vel.y,
            rotation,
            tick,
            nickname: self.nickname.clone(),
            rank: self.rank,
            health: self.health,
            max_health: self.max_health,
            shield: self.shield,
            max_shield: self.max_shield,
            podium: self.podium,
            ship_skin_id: self.ship_skins.selected_skin_id.clone(),
        }
    }

    pub fn wire_items(&self) -> Vec<WireItem> {
        self.items.iter().map(OwnedItem::wire).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::net::client::OutboundHandle;
    use stardrift_config::Registries;

    pub(crate) fn test_player(client_id: u64) -> Player {
        let registries = Registries::defaults();
        let ship_key = stardrift_config::DEFAULT_SHIP.to_string();
        let ship = registries.ship(&ship_key).clone();
        let mut player = Player {
            client_id,
            user_id: Uuid::new_v4(),
            db_id: client_id as i64,
            nickname: format!("pilot{client_id}"),
            ship: ship_key,
            pos: Vector2::ZERO,
            rotation: 0.0,
            vel: Vector2::ZERO,
            health: ship.health,
            shield: ship.shield,
            max_health: ship.health,
            max_shield: ship.shield,
            upgrades: Upgrades::default(),
            wallet: Wallet::default(),
            resources: HashMap::new(),
            items: Vec::new(),
            ship_skins: WireShipSkins::default(),
            is_dead: false,
            is_administrator: false,
            is_migrating: false,
            rank: 0,
            podium: 0,
            recent_honor: 0.0,
            last_input_at: 0,
            last_damage: 0,
            last_combat_stop: 0,
            last_client_tick: 0,
            recent_ops: RecentOps::new(RECENT_OPS_CAPACITY),
            position_inputs: VecDeque::new(),
            outbound: OutboundHandle::detached(),
        };
        player.recompute_derived(&ship, &registries.items);
        player
    }

    #[test]
    fn base_max_health_matches_config() {
        let player = test_player(1);
        // no upgrades, no items: floor(100000 * 1.0)
        assert_eq!(player.max_health, 100_000);
    }

    #[test]
    fn hp_upgrades_scale_by_five_percent() {
        let registries = Registries::defaults();
        let mut player = test_player(1);
        player.upgrades.hp = 3;
        let ship = registries.ship(&player.ship).clone();
        player.recompute_derived(&ship, &registries.items);
        assert_eq!(player.max_health, 115_000);
    }

    #[test]
    fn equipped_hull_item_raises_max_health() {
        let registries = Registries::defaults();
        let mut player = test_player(1);
        player.items.push(OwnedItem {
            id: "hull_plate_mk1".to_string(),
            instance_id: "inst-1".to_string(),
            acquired_at: 0,
            slot: None,
        });
        assert!(player.equip("inst-1", &registries.items));
        let ship = registries.ship(&player.ship).clone();
        player.recompute_derived(&ship, &registries.items);
        assert_eq!(player.max_health, 110_000);
    }

    #[test]
    fn one_item_per_slot() {
        let registries = Registries::defaults();
        let mut player = test_player(1);
        for n in 0..2 {
            player.items.push(OwnedItem {
                id: "hull_plate_mk1".to_string(),
                instance_id: format!("inst-{n}"),
                acquired_at: 0,
                slot: None,
            });
        }
        assert!(player.equip("inst-0", &registries.items));
        assert!(player.equip("inst-1", &registries.items));
        let equipped: Vec<_> = player.items.iter().filter(|i| i.slot.is_some()).collect();
        assert_eq!(equipped.len(), 1);
        assert_eq!(equipped[0].instance_id, "inst-1");
    }

    #[test]
    fn position_queue_drops_oldest_past_limit() {
        let mut player = test_player(1);
        for tick in 0..8u64 {
            player.queue_position_input(PositionInput {
                pos: Vector2::new(tick as f64, 0.0),
                rotation: 0.0,
                vel: Vector2::ZERO,
                tick,
                in_bounds: true,
            });
        }
        assert_eq!(player.position_inputs.len(), POSITION_QUEUE_LIMIT);
        assert_eq!(player.position_inputs.front().unwrap().tick, 3);
    }
}
