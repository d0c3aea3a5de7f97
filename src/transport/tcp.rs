//! TCP listener: accepts sockets and runs a handler task for each.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use super::handler::handle_connection;
use crate::broker::RouteRegistry;
use crate::config::Settings;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bind `addr` and serve forever. Only returns if binding fails.
pub async fn start_tcp_server(
    addr: &str,
    registry: Arc<RouteRegistry>,
    settings: Settings,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "broker listening");
    serve(listener, registry, settings).await;
    Ok(())
}

/// Accept connections from an already bound listener.
pub async fn serve(listener: TcpListener, registry: Arc<RouteRegistry>, settings: Settings) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(%peer, error = %e, "could not set TCP_NODELAY");
                }
                tokio::spawn(handle_connection(
                    stream,
                    peer.to_string(),
                    Arc::clone(&registry),
                    settings.broker.clone(),
                ));
            }
            Err(e) => {
                // Usually fd exhaustion; back off instead of spinning.
                tracing::error!(error = %e, "failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
