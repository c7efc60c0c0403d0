use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eduflow::api::router;
use eduflow::config::AppConfig;
use eduflow::kv::SqliteKvStore;
use eduflow::remote::{HttpRemoteStore, NoopRemoteStore, RemoteStore};
use eduflow::seed::SeedData;
use eduflow::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "eduflow=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let remote: Arc<dyn RemoteStore> = match config.remote.clone() {
        Some(remote_config) => Arc::new(HttpRemoteStore::new(remote_config)?),
        None => Arc::new(NoopRemoteStore),
    };
    let kv = Arc::new(SqliteKvStore::new(pool.clone(), config.local_storage_quota));

    let state = AppState::new(
        pool.clone(),
        kv,
        remote,
        SeedData::default(),
        config.spillover_threshold,
        config.spillover_gc_grace,
    );
    state.session.restore().await?;

    let _subscription = state.mirror.subscribe(config.sync_interval);

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
