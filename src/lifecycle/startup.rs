//! Startup orchestration.
//!
//! Config is loaded and validated by the caller; this resolves the secret,
//! starts metrics, binds the listener and runs the server until a signal.

use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::signing::Secret;

pub async fn run(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let secret = Secret::from_config(&config.signing);
    if secret.is_none() {
        tracing::warn!(
            secret_env = %config.signing.secret_env,
            "No signing secret configured; /proxy will answer 500 and the feed will use raw CDN URLs"
        );
    }

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, secret)?;

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, rx).await?;
    Ok(())
}
