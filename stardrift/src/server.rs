use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use stardrift_config::Registries;
use stardrift_core::time::GameClock;

use crate::auth::TokenVerifier;
use crate::crash::CrashReporter;
use crate::net::rate_limit::RateLimiters;
use crate::persist::{PlayerStore, SaveQueue};
use crate::world::{spawn_map, MapHandle};

const SAVE_QUEUE_CAPACITY: usize = 1024;

/// Process-wide state: the ports, the save queue, and one actor handle
/// per map. Everything gameplay-mutable lives inside the map actors.
pub struct Server {
    pub registries: Registries,
    pub clock: GameClock,
    pub store: Arc<dyn PlayerStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub crash: Arc<CrashReporter>,
    pub saves: SaveQueue,
    pub limits: RateLimiters,
    maps: HashMap<String, MapHandle>,
    next_client_id: AtomicU64,
}

impl Server {
    /// Build the server and spawn every configured map actor plus the
    /// persistence worker. Must run inside the tokio runtime.
    pub fn new(
        registries: Registries,
        store: Arc<dyn PlayerStore>,
        verifier: Arc<dyn TokenVerifier>,
        crash: Arc<CrashReporter>,
    ) -> Arc<Self> {
        let clock = GameClock::new();
        let saves = SaveQueue::new(SAVE_QUEUE_CAPACITY);
        saves.spawn_worker(store.clone(), crash.clone());

        let maps: HashMap<String, MapHandle> = registries
            .maps
            .iter()
            .map(|config| {
                let handle = spawn_map(
                    config.clone(),
                    registries.clone(),
                    clock.clone(),
                    saves.clone(),
                    store.clone(),
                    crash.clone(),
                );
                (config.id.clone(), handle)
            })
            .collect();

        let limits = RateLimiters::from_config(&registries.server.rate_limits);
        Arc::new(Self {
            registries,
            clock,
            store,
            verifier,
            crash,
            saves,
            limits,
            maps,
            next_client_id: AtomicU64::new(1),
        })
    }

    pub fn allocate_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn map(&self, map_id: &str) -> Option<&MapHandle> {
        self.maps.get(map_id)
    }

    /// The map new players land on when their row names none (or a
    /// stale one).
    pub fn default_map(&self) -> Option<&MapHandle> {
        self.maps
            .get(&self.registries.server.default_map)
            .or_else(|| self.maps.values().next())
    }

    pub fn shutdown(&self) {
        for handle in self.maps.values() {
            handle.shutdown();
        }
    }
}
