//! dpr-intake - Document intake and analysis service
//!
//! Single-process, event-driven: upload handling never blocks on scoring;
//! each upload spawns one detached analysis task and the client polls the
//! record until it leaves "processing".

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dpr_intake::config::Config;
use dpr_intake::services::ScoringEngine;
use dpr_intake::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting dpr-intake (Document intake and analysis)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("Database: {}", config.database_path.display());

    let db_pool = dpr_intake::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let engine = ScoringEngine::new(&config);
    let state = AppState::new(db_pool, engine);

    let app = dpr_intake::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
