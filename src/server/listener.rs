use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::Connection;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Binds the configured address. A port of 0 gets an ephemeral port; read
/// it back with `local_addr`.
pub async fn bind(cfg: &Config) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.server.listen_addr))?;
    let addr = listener.local_addr().context("reading bound address")?;
    info!("httpd running on {}", addr);
    Ok(listener)
}

/// Accepts connections forever, one task per connection.
pub async fn serve(listener: TcpListener, cfg: Arc<Config>) -> anyhow::Result<()> {
    info!(root = %cfg.static_files.root.display(), "serving documents");

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!("Accept failed: {}", e);
                // Usually out of descriptors; give in-flight requests a moment.
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let cfg = cfg.clone();
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, cfg);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    let listener = bind(&cfg).await?;
    serve(listener, Arc::new(cfg)).await
}
