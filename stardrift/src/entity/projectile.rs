use stardrift_core::math::Vector2;
use stardrift_protocol::ProjectileSource;

/// Non-homing shots live this long.
pub const FREE_FLIGHT_LIFETIME_MS: u64 = 10_000;
/// Homing lifetime caps by shooter kind.
pub const PLAYER_HOMING_CAP_MS: u64 = 8_000;
pub const NPC_HOMING_CAP_MS: u64 = 12_000;
/// Hard world boundary for projectiles; beyond this they are culled.
pub const CULL_EXTENT: f64 = 25_000.0;
/// A homing projectile farther than this from its target is dropped.
pub const MAX_TARGET_DISTANCE: f64 = 2_000.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectileOwner {
    Player(u64),
    Npc(String),
}

impl ProjectileOwner {
    pub fn source(&self) -> ProjectileSource {
        match self {
            Self::Player(_) => ProjectileSource::Player,
            Self::Npc(_) => ProjectileSource::Npc,
        }
    }

    pub fn wire_id(&self) -> String {
        match self {
            Self::Player(client_id) => client_id.to_string(),
            Self::Npc(id) => id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    Player(u64),
    Npc(String),
}

impl TargetRef {
    pub fn wire_id(&self) -> String {
        match self {
            Self::Player(client_id) => client_id.to_string(),
            Self::Npc(id) => id.clone(),
        }
    }
}

pub struct Projectile {
    pub id: String,
    pub owner: ProjectileOwner,
    pub pos: Vector2,
    pub vel: Vector2,
    pub damage: i64,
    pub projectile_type: String,
    pub target: Option<TargetRef>,
    pub created_at: u64,
    pub initial_distance: Option<f64>,
    pub lifetime_ms: u64,
}

impl Projectile {
    pub fn is_homing(&self) -> bool {
        self.target.is_some()
    }

    pub fn expired(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) >= self.lifetime_ms
    }

    pub fn out_of_bounds(&self) -> bool {
        self.pos.x.abs() > CULL_EXTENT || self.pos.y.abs() > CULL_EXTENT
    }
}

/// Homing lifetime: expected flight time plus a margin of at most 3 s
/// (never more than 50% of the flight time), capped per shooter kind.
pub fn homing_lifetime_ms(initial_distance: f64, speed: f64, owner: &ProjectileOwner) -> u64 {
    let cap = match owner {
        ProjectileOwner::Player(_) => PLAYER_HOMING_CAP_MS,
        ProjectileOwner::Npc(_) => NPC_HOMING_CAP_MS,
    };
    if speed <= f64::EPSILON {
        return cap;
    }
    let flight_ms = initial_distance / speed * 1000.0;
    let margin_ms = (flight_ms * 0.5).min(3_000.0);
    ((flight_ms + margin_ms) as u64).min(cap)
}
