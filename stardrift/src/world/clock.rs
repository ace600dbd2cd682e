use std::time::Duration;

use tokio::time::Instant;

/// Fixed-rate deadline scheduler for one map. If a tick overruns its
/// slot the next one fires immediately and the schedule rebases from
/// now, so a stall never produces a burst of catch-up frames.
pub struct TickClock {
    period: Duration,
    next: Instant,
}

impl TickClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    pub async fn tick(&mut self) {
        tokio::time::sleep_until(self.next).await;
        let now = Instant::now();
        self.next += self.period;
        if self.next < now {
            // overran more than a full period: rebase instead of batching
            self.next = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_land_on_the_period_grid() {
        let mut clock = TickClock::new(Duration::from_millis(50));
        let start = Instant::now();
        for _ in 0..4 {
            clock.tick().await;
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(260));
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_rebases_without_batching() {
        let mut clock = TickClock::new(Duration::from_millis(50));
        clock.tick().await;
        // simulate a 500 ms stall inside the tick body
        tokio::time::advance(Duration::from_millis(500)).await;
        let before = Instant::now();
        clock.tick().await; // fires immediately
        assert!(before.elapsed() < Duration::from_millis(1));
        // the next tick is a full period out, not another catch-up
        let before = Instant::now();
        clock.tick().await;
        assert!(before.elapsed() >= Duration::from_millis(50));
    }
}
