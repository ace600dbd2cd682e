use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use stardrift_config::RateLimitConfig;
use stardrift_protocol::server::Serverbound;

type ClientLimiter = RateLimiter<u64, DefaultKeyedStateStore<u64>, DefaultClock>;

/// Quota for unknown-type and other miscellaneous frames.
const MISC_PER_SEC: u32 = 20;

/// The inbound categories with separate windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Heartbeat,
    Position,
    Chat,
    Combat,
    /// Everything else, including unknown-type spam.
    Other,
}

impl Category {
    pub fn of(message: &Serverbound) -> Self {
        match message {
            Serverbound::Heartbeat(_) => Self::Heartbeat,
            Serverbound::PositionUpdate(_) => Self::Position,
            Serverbound::ChatMessage(_) => Self::Chat,
            Serverbound::StartCombat(_)
            | Serverbound::StopCombat(_)
            | Serverbound::ProjectileFired(_) => Self::Combat,
            _ => Self::Other,
        }
    }

    /// Whether a violation corresponds to a deliberate user action the
    /// client should hear about.
    pub fn user_visible(&self) -> bool {
        matches!(self, Self::Chat | Self::Combat)
    }
}

/// Process-wide rate limiters, one keyed `RateLimiter` per category.
/// The key is the server-assigned connection id, so every connection
/// gets its own quota without per-session state.
pub struct RateLimiters {
    heartbeat: ClientLimiter,
    position: ClientLimiter,
    chat: ClientLimiter,
    combat: ClientLimiter,
    misc: ClientLimiter,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            heartbeat: keyed(config.heartbeat_per_sec, config.burst),
            position: keyed(config.position_per_sec, config.burst),
            chat: keyed(config.chat_per_sec, config.burst),
            combat: keyed(config.combat_per_sec, config.burst),
            misc: keyed(MISC_PER_SEC, config.burst),
        }
    }

    pub fn allow(&self, client_id: u64, category: Category) -> bool {
        let limiter = match category {
            Category::Heartbeat => &self.heartbeat,
            Category::Position => &self.position,
            Category::Chat => &self.chat,
            Category::Combat => &self.combat,
            Category::Other => &self.misc,
        };
        limiter.check_key(&client_id).is_ok()
    }

    /// Shed bookkeeping for keys that went quiet. Run when a session
    /// ends; connection ids are never reused so stale entries only
    /// cost memory.
    pub fn sweep(&self) {
        self.heartbeat.retain_recent();
        self.position.retain_recent();
        self.chat.retain_recent();
        self.combat.retain_recent();
        self.misc.retain_recent();
    }
}

fn keyed(per_sec: u32, burst: u32) -> ClientLimiter {
    let rate = NonZeroU32::new(per_sec.max(1)).unwrap_or(NonZeroU32::MIN);
    let cells = NonZeroU32::new(per_sec.max(1).saturating_mul(burst.max(1)))
        .unwrap_or(NonZeroU32::MIN);
    RateLimiter::keyed(Quota::per_second(rate).allow_burst(cells))
}
