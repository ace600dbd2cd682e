use std::path::PathBuf;
use std::sync::Arc;

use log::LevelFilter;

use stardrift::auth::LocalTokenVerifier;
use stardrift::crash::{install_panic_hook, CrashReporter};
use stardrift::net::listener;
use stardrift::persist::MemoryPlayerStore;
use stardrift::server::Server;
use stardrift_config::Registries;

#[tokio::main]
async fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .with_threads(true)
        .init()
        .expect("logger initializes once");

    let started = time::OffsetDateTime::now_utc();
    log::info!("stardrift server starting at {started}");

    let config_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config"));
    let registries = Registries::load(&config_dir);

    let crash = Arc::new(CrashReporter::new("crash-reports"));
    install_panic_hook(crash.clone());

    let store = Arc::new(MemoryPlayerStore::default());
    let verifier = Arc::new(LocalTokenVerifier);
    let server = Server::new(registries, store.clone(), verifier, crash.clone());

    let accept = tokio::spawn(listener::run(server.clone()));

    tokio::select! {
        result = accept => {
            if let Ok(Err(err)) = result {
                crash.write_report("listener_failed", &err.to_string());
                log::error!("listener failed: {err}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutdown requested");
        }
    }

    server.shutdown();
    // give the map actors a tick to flush their players, then drain
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    server.saves.drain(store.as_ref(), &crash).await;
    log::info!("stardrift server stopped");
}
