//! Data model for dpr-intake

pub mod analysis;
pub mod user;

pub use analysis::{
    Analysis, AnalysisData, AnalysisResult, AnalysisStatus, AnalysisUpdate, ComplianceIssue,
    NewAnalysis, RiskFactor, RiskLevel, SectionScores,
};
pub use user::User;
