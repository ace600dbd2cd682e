use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::{PlayerRow, PlayerStore};
use crate::crash::CrashReporter;

/// One pending save.
pub struct SaveRequest {
    pub row: PlayerRow,
    pub reason: String,
}

/// Bounded fire-and-forget save queue. Producers are tick loops that
/// must never block; on overflow the oldest request is displaced and
/// logged. A single worker drains into the store.
#[derive(Clone)]
pub struct SaveQueue {
    queue: Arc<ArrayQueue<SaveRequest>>,
    notify: Arc<Notify>,
}

impl SaveQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn enqueue(&self, row: PlayerRow, reason: impl Into<String>) {
        let request = SaveRequest {
            row,
            reason: reason.into(),
        };
        if let Some(dropped) = self.queue.force_push(request) {
            log::warn!(
                "save queue full, dropping oldest request for {} ({})",
                dropped.row.user_id,
                dropped.reason
            );
        }
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drain everything currently queued into the store. Used by the
    /// worker and by shutdown to flush synchronously.
    pub async fn drain(&self, store: &dyn PlayerStore, crash: &CrashReporter) {
        while let Some(request) = self.queue.pop() {
            let user_id = request.row.user_id;
            if let Err(err) = store.save(request.row, &request.reason).await {
                log::error!("persist failed for {user_id} ({}): {err}", request.reason);
                crash.record(None, "persist_error", format!("{user_id}: {err}"));
            }
        }
    }

    pub fn spawn_worker(
        &self,
        store: Arc<dyn PlayerStore>,
        crash: Arc<CrashReporter>,
    ) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            loop {
                queue.drain(store.as_ref(), &crash).await;
                queue.notify.notified().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryPlayerStore;
    use uuid::Uuid;

    fn row(user_id: Uuid) -> PlayerRow {
        PlayerRow {
            db_id: 1,
            user_id,
            nickname: "Nova".to_string(),
            ship: stardrift_config::DEFAULT_SHIP.to_string(),
            map_id: None,
            upgrades: Default::default(),
            wallet: Default::default(),
            resources: Default::default(),
            items: Vec::new(),
            ship_skins: Default::default(),
            is_administrator: false,
        }
    }

    #[test]
    fn overflow_displaces_oldest() {
        let queue = SaveQueue::new(2);
        let first = Uuid::new_v4();
        queue.enqueue(row(first), "one");
        queue.enqueue(row(Uuid::new_v4()), "two");
        queue.enqueue(row(Uuid::new_v4()), "three");
        assert_eq!(queue.len(), 2);
        // the survivor at the head is "two", not "one"
        let head = queue.queue.pop().unwrap();
        assert_eq!(head.reason, "two");
    }

    #[tokio::test]
    async fn drain_lands_rows_in_the_store() {
        let queue = SaveQueue::new(8);
        let store = MemoryPlayerStore::default();
        let crash = CrashReporter::new("/tmp/stardrift-test-reports");
        let user = Uuid::new_v4();
        queue.enqueue(row(user), "disconnect");
        queue.drain(&store, &crash).await;
        assert!(queue.is_empty());
        let loaded = store.load(user, "other").await.unwrap();
        assert_eq!(loaded.nickname, "Nova");
    }
}
