// ==========================================
// Space Stowage - HTTP service entry point
// ==========================================

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use space_stowage::app::{get_default_db_path, router, AppState};

const BIND_ENV: &str = "SPACE_STOWAGE_BIND";
const DEFAULT_BIND: &str = "127.0.0.1:8000";
const LOG_FORMAT_ENV: &str = "SPACE_STOWAGE_LOG_FORMAT";

#[tokio::main]
async fn main() -> Result<()> {
    match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => space_stowage::logging::init_json(),
        _ => space_stowage::logging::init(),
    }
    space_stowage::perf::configure_from_env();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", space_stowage::APP_NAME, space_stowage::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!(db_path = %db_path, "using database");
    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    let bind = std::env::var(BIND_ENV).unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid {} value: {}", BIND_ENV, bind))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router(Arc::new(state))).await?;
    Ok(())
}
