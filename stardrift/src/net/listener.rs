use std::sync::Arc;

use tokio::net::TcpListener;

use crate::net::session;
use crate::server::Server;

/// Bind the configured address and serve forever.
pub async fn run(server: Arc<Server>) -> std::io::Result<()> {
    let bind = server.registries.server.bind_address.clone();
    let listener = TcpListener::bind(&bind).await?;
    log::info!("listening on ws://{bind}");
    run_on(server, listener).await
}

/// Accept loop over an already-bound listener. Each connection gets
/// its own session task; a failed accept is logged and the loop keeps
/// going.
pub async fn run_on(server: Arc<Server>, listener: TcpListener) -> std::io::Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(session::run_connection(server.clone(), stream, addr));
            }
            Err(err) => {
                log::warn!("accept failed: {err}");
            }
        }
    }
}
