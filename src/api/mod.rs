//! HTTP API handlers for dpr-intake

pub mod analyses;
pub mod health;

pub use analyses::analysis_routes;
pub use health::health_routes;
