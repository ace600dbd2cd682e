use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic millisecond clock for simulation bookkeeping. All gameplay
/// timestamps (`last_damage`, cargo expiry, respawn due times) are
/// milliseconds read from one of these, never wall-clock time.
///
/// Clones share the same timebase. `advance` applies a manual skew,
/// which is how harnesses and replays drive time without sleeping.
#[derive(Debug, Clone)]
pub struct GameClock {
    start: Instant,
    start_unix: u64,
    skew_ms: Arc<AtomicU64>,
}

impl GameClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_unix: unix_ms(),
            skew_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64 + self.skew_ms.load(Ordering::Relaxed)
    }

    /// Push the clock forward. Visible to every clone.
    pub fn advance(&self, ms: u64) {
        self.skew_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Project a monotonic timestamp onto the wall clock for wire
    /// fields the client displays.
    pub fn wall_from(&self, game_ms: u64) -> u64 {
        self.start_unix + game_ms
    }

    pub fn now_wall(&self) -> u64 {
        self.wall_from(self.now_ms())
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock unix milliseconds, used only for wire `t` fields the
/// client displays and for report file names.
pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_clock_is_monotonic() {
        let clock = GameClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn advance_is_shared_between_clones() {
        let clock = GameClock::new();
        let other = clock.clone();
        let before = other.now_ms();
        clock.advance(5_000);
        assert!(other.now_ms() >= before + 5_000);
    }
}
