use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use sparkle_drive::config::AppConfig;
use sparkle_drive::db::SqliteStore;
use sparkle_drive::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let store = SqliteStore::open(&config.database_url)?;
    tracing::info!("opened booking store at {}", config.database_url);

    let state = Arc::new(AppState {
        store: Box::new(store),
        config: config.clone(),
    });

    let app = sparkle_drive::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
