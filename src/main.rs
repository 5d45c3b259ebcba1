use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classtrack::classroom::{ClassroomConfig, ClassroomHttpClient};
use classtrack::routes::router;
use classtrack::services::SyncScheduler;
use classtrack::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "classtrack=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://classtrack.db".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let config = ClassroomConfig::new_from_env()?;
    let classroom = Arc::new(ClassroomHttpClient::new(config)?);

    if let Ok(secs) = std::env::var("SYNC_INTERVAL_SECS") {
        let interval_secs: u64 = secs
            .parse()
            .map_err(|_| format!("invalid SYNC_INTERVAL_SECS: {secs}"))?;
        let scheduler = SyncScheduler::new(pool.clone(), classroom.clone(), interval_secs);
        tokio::spawn(scheduler.start());
    }

    let state = AppState {
        db: pool.clone(),
        classroom,
    };

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
