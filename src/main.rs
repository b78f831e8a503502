//! shadowchatd - ShadowChat daemon
//!
//! Serves the matching engine over a line-based TCP gateway.

use shadowchat::clock::{SharedClock, SystemClock};
use shadowchat::config::{self, Config};
use shadowchat::engine::Engine;
use shadowchat::network::{ClientRegistry, Gateway, Hub};
use shadowchat::{http, metrics, store};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server.name,
        backend = ?config.store.backend,
        admins = config.server.admin_ids.len(),
        "Starting shadowchatd"
    );

    let clock: SharedClock = Arc::new(SystemClock);
    let store = store::open(&config.store, clock.clone())?;
    let engine = Arc::new(Engine::new(store, clock, &config));

    // Expired-key sweep
    {
        let engine = Arc::clone(&engine);
        let period = config.store.sweep_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                match engine.sweep().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Swept expired keys"),
                    Err(e) => warn!(error = %e, "Expired-key sweep failed"),
                }
            }
        });
    }

    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port.unwrap_or(9090);
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        tokio::spawn(async move {
            http::run_http_server(metrics_port).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let hub = Arc::new(Hub::new(
        engine,
        Arc::new(ClientRegistry::new()),
        &config.server.admin_ids,
    ));
    let gateway = Gateway::bind(config.listen.address, hub).await?;

    tokio::select! {
        result = gateway.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
