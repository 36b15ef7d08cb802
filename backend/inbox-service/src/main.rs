use std::sync::Arc;

use inbox_service::{
    config::Config,
    db, error,
    gateway::SessionRegistry,
    jobs::story_sweeper::start_story_sweeper,
    routes,
    state::AppState,
    store::{EntityStore, PgStore},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Arc::new(Config::from_env()?);

    let pool = db::init_pool(&cfg.database_url, cfg.database_max_connections)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Run embedded migrations (idempotent). Schema drift is fatal.
    db::MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| error::AppError::StartServer(format!("database migrations failed: {e}")))?;

    let store: Arc<dyn EntityStore> = Arc::new(PgStore::new(pool));
    let gateway = SessionRegistry::new();
    let state = AppState::new(store.clone(), gateway, cfg.clone());

    // Internal expiry sweep; the sweep endpoint stays available for an
    // external scheduler, both converge on the same end state.
    tokio::spawn(start_story_sweeper(store, cfg.sweep_interval()));

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting inbox-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    axum::serve(listener, routes::build_router(state))
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
