//! Application entrypoint and state wiring.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use audit_chain::{routes, AppState, Ledger, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // 1) config
    let config =
        ServerConfig::load(Path::new(".env")).context("reading server configuration")?;

    // 2) genesis, before any request can be served
    let ledger = Ledger::new().context("creating genesis block")?;

    // 3) shared state + router
    let state = AppState {
        ledger: Arc::new(ledger),
    };
    let app = routes::build_router(state, &config);

    // 4) serve
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "audit chain listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
