use stardrift_config::NpcTypeConfig;
use stardrift_core::math::Vector2;
use stardrift_protocol::client::{NpcDelta, NpcState};

/// NPC behavior states. Transitions are evaluated every tick, in
/// order: low health wins, then aggro memory, then cruise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Cruise,
    Aggressive,
    Flee,
}

impl Behavior {
    pub fn initial(&self) -> char {
        match self {
            Self::Cruise => 'c',
            Self::Aggressive => 'a',
            Self::Flee => 'f',
        }
    }
}

pub struct Npc {
    pub id: String,
    pub kind: String,
    pub pos: Vector2,
    pub vel: Vector2,
    pub rotation: f64,
    pub health: i64,
    pub shield: i64,
    pub max_health: i64,
    pub max_shield: i64,
    pub behavior: Behavior,
    pub last_attacker: Option<u64>,
    pub last_damage: u64,
    pub last_player_in_range: u64,
    pub last_attack_time: u64,
    pub last_significant_move: u64,
    /// Pose and vitals last shipped on the bulk channel, used to skip
    /// unchanged rows.
    pub last_broadcast: Option<(Vector2, f64, i64, i64, Behavior)>,
}

impl Npc {
    pub fn spawn(id: String, kind: &str, config: &NpcTypeConfig, pos: Vector2, now: u64) -> Self {
        Self {
            id,
            kind: kind.to_string(),
            pos,
            vel: Vector2::ZERO,
            rotation: 0.0,
            health: config.health,
            shield: config.shield,
            max_health: config.health,
            max_shield: config.shield,
            behavior: Behavior::Cruise,
            last_attacker: None,
            last_damage: 0,
            last_player_in_range: 0,
            last_attack_time: 0,
            last_significant_move: now,
            last_broadcast: None,
        }
    }

    pub fn state(&self) -> NpcState {
        NpcState {
            id: self.id.clone(),
            npc_type: self.kind.clone(),
            x: self.pos.x,
            y: self.pos.y,
            rotation: self.rotation,
            health: self.health,
            max_health: self.max_health,
            shield: self.shield,
            max_shield: self.max_shield,
            behavior: self.behavior.initial(),
        }
    }

    pub fn delta(&self) -> NpcDelta {
        NpcDelta {
            id: self.id.clone(),
            x: self.pos.x,
            y: self.pos.y,
            rotation: self.rotation,
            health: self.health,
            shield: self.shield,
            behavior: self.behavior.initial(),
        }
    }

    /// Whether the bulk channel needs a fresh row for this NPC.
    pub fn needs_broadcast(&self) -> bool {
        match &self.last_broadcast {
            None => true,
            Some((pos, rotation, health, shield, behavior)) => {
                pos.distance_squared(&self.pos) > 1.0
                    || (rotation - self.rotation).abs() > 0.01
                    || *health != self.health
                    || *shield != self.shield
                    || *behavior != self.behavior
            }
        }
    }

    pub fn mark_broadcast(&mut self) {
        self.last_broadcast = Some((
            self.pos,
            self.rotation,
            self.health,
            self.shield,
            self.behavior,
        ));
    }
}
