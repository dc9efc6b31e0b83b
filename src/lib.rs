//! dpr-intake - Document intake and analysis service
//!
//! Accepts DPR (Detailed Project Report) uploads, extracts their text, and
//! scores them through an analysis pipeline (remote model when configured,
//! local keyword heuristic otherwise, multi-agent consensus on top).
//! Results are persisted per analysis id through a
//! processing/completed/failed lifecycle and served to the dashboard UI over
//! a small JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::ScoringEngine;

/// Upper bound on request bodies; the validator enforces the 10MB file limit
const MAX_UPLOAD_BODY_BYTES: usize = 12 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (the analysis store)
    pub db: SqlitePool,
    /// Scoring engine, built once at startup
    pub engine: Arc<ScoringEngine>,
}

impl AppState {
    pub fn new(db: SqlitePool, engine: ScoringEngine) -> Self {
        Self {
            db,
            engine: Arc::new(engine),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analysis_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
