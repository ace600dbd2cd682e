use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use stardrift_core::time::unix_ms;
use uuid::Uuid;

use super::{PlayerRow, PlayerStore, StoreError};
use crate::entity::player::{Upgrades, Wallet};
use stardrift_protocol::WireShipSkins;

const STARTING_CREDITS: i64 = 10_000;

/// Process-local store. The default deployment for development and the
/// workhorse for tests; production wires a database-backed port here.
pub struct MemoryPlayerStore {
    rows: RwLock<HashMap<Uuid, PlayerRow>>,
    honor: RwLock<HashMap<Uuid, Vec<(u64, i64)>>>,
    next_db_id: AtomicI64,
    default_ship: String,
}

impl MemoryPlayerStore {
    pub fn new(default_ship: impl Into<String>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            honor: RwLock::new(HashMap::new()),
            next_db_id: AtomicI64::new(1),
            default_ship: default_ship.into(),
        }
    }

    fn fresh_row(&self, user_id: Uuid, nickname: &str) -> PlayerRow {
        PlayerRow {
            db_id: self.next_db_id.fetch_add(1, Ordering::Relaxed),
            user_id,
            nickname: nickname.to_string(),
            ship: self.default_ship.clone(),
            map_id: None,
            upgrades: Upgrades::default(),
            wallet: Wallet {
                credits: STARTING_CREDITS,
                ..Wallet::default()
            },
            resources: HashMap::new(),
            items: Vec::new(),
            ship_skins: WireShipSkins::default(),
            is_administrator: false,
        }
    }
}

impl Default for MemoryPlayerStore {
    fn default() -> Self {
        Self::new(stardrift_config::DEFAULT_SHIP)
    }
}

#[async_trait]
impl PlayerStore for MemoryPlayerStore {
    async fn load(&self, user_id: Uuid, nickname: &str) -> Result<PlayerRow, StoreError> {
        if let Some(row) = self.rows.read().get(&user_id) {
            return Ok(row.clone());
        }
        let row = self.fresh_row(user_id, nickname);
        self.rows.write().insert(user_id, row.clone());
        Ok(row)
    }

    async fn save(&self, row: PlayerRow, reason: &str) -> Result<(), StoreError> {
        log::debug!("saving player {} ({reason})", row.user_id);
        self.rows.write().insert(row.user_id, row);
        Ok(())
    }

    async fn save_honor_snapshot(
        &self,
        user_id: Uuid,
        honor: i64,
        _source: &str,
    ) -> Result<(), StoreError> {
        self.honor
            .write()
            .entry(user_id)
            .or_default()
            .push((unix_ms(), honor));
        Ok(())
    }

    async fn recent_honor_average(&self, user_id: Uuid, days: u32) -> Result<f64, StoreError> {
        let honor = self.honor.read();
        let Some(snapshots) = honor.get(&user_id) else {
            return Ok(0.0);
        };
        let cutoff = unix_ms().saturating_sub(u64::from(days) * 24 * 60 * 60 * 1000);
        let recent: Vec<i64> = snapshots
            .iter()
            .filter(|(at, _)| *at >= cutoff)
            .map(|(_, honor)| *honor)
            .collect();
        if recent.is_empty() {
            return Ok(0.0);
        }
        Ok(recent.iter().sum::<i64>() as f64 / recent.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_creates_then_reuses_rows() {
        let store = MemoryPlayerStore::default();
        let user = Uuid::new_v4();
        let first = store.load(user, "Nova").await.unwrap();
        let second = store.load(user, "Renamed").await.unwrap();
        assert_eq!(first.db_id, second.db_id);
        assert_eq!(second.nickname, "Nova");
        assert_eq!(first.wallet.credits, STARTING_CREDITS);
    }

    #[tokio::test]
    async fn db_ids_are_unique() {
        let store = MemoryPlayerStore::default();
        let a = store.load(Uuid::new_v4(), "a").await.unwrap();
        let b = store.load(Uuid::new_v4(), "b").await.unwrap();
        assert_ne!(a.db_id, b.db_id);
    }

    #[tokio::test]
    async fn honor_average_covers_recent_snapshots() {
        let store = MemoryPlayerStore::default();
        let user = Uuid::new_v4();
        store.save_honor_snapshot(user, 10, "kill").await.unwrap();
        store.save_honor_snapshot(user, 20, "kill").await.unwrap();
        let avg = store.recent_honor_average(user, 7).await.unwrap();
        assert!((avg - 15.0).abs() < f64::EPSILON);
    }
}
