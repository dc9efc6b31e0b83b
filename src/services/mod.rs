//! Analysis pipeline services
//!
//! Leaf-first: validator gates uploads, extractor turns bytes into text, the
//! scoring engine (local heuristic, optional remote model, multi-agent
//! consensus pass) turns text into a bounded `AnalysisResult`.

pub mod agents;
pub mod extractor;
pub mod heuristic;
pub mod openai_client;
pub mod scoring;
pub mod validator;

pub use extractor::{extract_text, ExtractionError};
pub use scoring::ScoringEngine;
pub use validator::{validate_dpr_file, ValidationError};
