use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ruinbot::api;
use ruinbot::catalog::RUINS;
use ruinbot::config::Config;
use ruinbot::explored::ExploredSet;
use ruinbot::state::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    tracing::info!(
        "ruinbot starting, listen: {}, game: {}, ui config: {}",
        config.listen_addr,
        config.game_package,
        config.ui_config.display(),
    );

    let explored = ExploredSet::load(&config.explored_file);
    tracing::info!(
        "{} of {} catalog ruins already explored",
        explored.len(),
        RUINS.len()
    );

    let state: AppState = Arc::new(Mutex::new(AppStateInner::new(config.clone())));

    let app = api::router(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .context(format!("failed to bind to {}", config.listen_addr))?;

    tracing::info!("listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
