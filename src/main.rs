use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prestamos_api::app::build_router;
use prestamos_api::config::Config;
use prestamos_api::db::Database;
use prestamos_api::handlers::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prestamos_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Short-TTL cache for the statistics endpoint; every dashboard load hits it
    let stats_cache = Cache::builder()
        .time_to_live(Duration::from_secs(60))
        .max_capacity(16)
        .build();

    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        config: config.clone(),
        stats_cache,
    });

    let app = build_router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
