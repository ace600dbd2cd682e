use serde::{Deserialize, Serialize};

/// Top level server settings (`config/server.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_address: String,
    /// Simulation rate in ticks per second.
    pub tick_rate: u32,
    /// Map new players join when their row names no map.
    pub default_map: String,
    /// Inbound frame size cap in bytes.
    pub max_frame_bytes: usize,
    /// Periodic persistence interval.
    pub save_interval_ms: u64,
    /// Emit one `player_state_update` per kill (false) or coalesce per
    /// tick (true). Kept per-kill by default.
    pub coalesce_state_updates: bool,
    /// Interest radius for map-global broadcasts (npc spawns etc.).
    pub global_interest_radius: f64,
    /// Interest radius for local effects (explosions, hit flashes).
    pub local_interest_radius: f64,
    /// Interest radius for homing projectile position updates.
    pub projectile_interest_radius: f64,
    pub rate_limits: RateLimitConfig,
    pub repair: RepairConfig,
    pub cargo: CargoRules,
    /// Lowercase words masked out of chat messages.
    pub chat_banned_words: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8878".to_string(),
            tick_rate: 20,
            default_map: "alpha".to_string(),
            max_frame_bytes: 64 * 1024,
            save_interval_ms: 5 * 60 * 1000,
            coalesce_state_updates: false,
            global_interest_radius: 50_000.0,
            local_interest_radius: 2_000.0,
            projectile_interest_radius: 4_000.0,
            rate_limits: RateLimitConfig::default(),
            repair: RepairConfig::default(),
            cargo: CargoRules::default(),
            chat_banned_words: Vec::new(),
        }
    }
}

/// Cargo pickup tuning shared by every map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CargoRules {
    /// Max distance between player and box to collect.
    pub collect_distance: f64,
    /// Channel length for a pickup.
    pub channel_duration_ms: u64,
    /// How far a player may drift from their channel anchor.
    pub drift_tolerance: f64,
    /// Killer-only window after spawn.
    pub exclusivity_ms: u64,
    /// Box lifetime after spawn.
    pub expiry_ms: u64,
}

impl Default for CargoRules {
    fn default() -> Self {
        Self {
            collect_distance: 520.0,
            channel_duration_ms: 1_800,
            drift_tolerance: 26.0,
            exclusivity_ms: 10_000,
            expiry_ms: 60_000,
        }
    }
}

/// Out-of-combat restoration. Shield comes back first, hull slower.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Quiet time after the last damage before repair starts.
    pub delay_ms: u64,
    /// Fraction of max shield restored per second.
    pub shield_fraction_per_sec: f64,
    /// Fraction of max hull restored per second, only once shield is full.
    pub hull_fraction_per_sec: f64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            delay_ms: 10_000,
            shield_fraction_per_sec: 0.05,
            hull_fraction_per_sec: 0.02,
        }
    }
}

impl ServerConfig {
    pub fn tick_interval_ms(&self) -> u64 {
        1000 / u64::from(self.tick_rate.max(1))
    }
}

/// Per-category inbound quotas, in messages per second.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub heartbeat_per_sec: u32,
    pub position_per_sec: u32,
    pub chat_per_sec: u32,
    pub combat_per_sec: u32,
    /// Burst headroom multiplier applied to every quota.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            heartbeat_per_sec: 2,
            position_per_sec: 40,
            chat_per_sec: 3,
            combat_per_sec: 6,
            burst: 1,
        }
    }
}
