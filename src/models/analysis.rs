//! Analysis entity and scoring result value types
//!
//! One `Analysis` record exists per uploaded document. While
//! `status = processing` all result fields are `None`; once the record turns
//! terminal (`completed` or `failed`) the orchestrator guarantees
//! `analyzed_at` and `analysis_data.sections` are populated (all zeros on
//! failure).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Analysis lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Record created, detached extract+score task still running
    Processing,
    /// Scoring finished, full results present
    Completed,
    /// Extraction or scoring failed, placeholder results present
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(AnalysisStatus::Processing),
            "completed" => Some(AnalysisStatus::Completed),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }
}

/// Risk / severity grade shared by risk factors and compliance issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

/// One identified project risk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub category: String,
    pub description: String,
    pub level: RiskLevel,
    /// Likelihood in [0,100]
    pub probability: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

/// One identified compliance gap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub title: String,
    pub description: String,
    pub severity: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// The six fixed per-section scores, each in [0,100]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionScores {
    pub technical_specs: i64,
    pub budget_details: i64,
    pub timeline: i64,
    pub environmental: i64,
    pub safety: i64,
    pub legal_compliance: i64,
}

impl SectionScores {
    /// Section scores paired with their wire-format labels, in fixed order
    pub fn as_pairs(&self) -> [(&'static str, i64); 6] {
        [
            ("technicalSpecs", self.technical_specs),
            ("budgetDetails", self.budget_details),
            ("timeline", self.timeline),
            ("environmental", self.environmental),
            ("safety", self.safety),
            ("legalCompliance", self.legal_compliance),
        ]
    }

    /// Arithmetic mean of the six scores
    pub fn mean(&self) -> f64 {
        let pairs = self.as_pairs();
        pairs.iter().map(|(_, score)| *score as f64).sum::<f64>() / pairs.len() as f64
    }
}

/// Structured section/finding payload attached to a terminal analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub sections: SectionScores,
    pub detailed_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub missing_elements: Vec<String>,
}

impl AnalysisData {
    /// Placeholder payload for failed analyses: zeroed sections plus one
    /// finding carrying the failure reason.
    pub fn failure(reason: &str) -> Self {
        AnalysisData {
            sections: SectionScores::default(),
            detailed_findings: vec![format!("Analysis failed: {}", reason)],
            recommendations: Vec::new(),
            missing_elements: Vec::new(),
        }
    }
}

/// Complete scoring output, produced by either scoring strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_score: i64,
    pub completeness_score: i64,
    pub compliance_score: i64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<RiskFactor>,
    pub compliance_issues: Vec<ComplianceIssue>,
    pub analysis_data: AnalysisData,
}

/// The central entity: one scored instance of an uploaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub status: AnalysisStatus,
    pub uploaded_at: DateTime<Utc>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub language: String,
    pub extracted_text: Option<String>,
    pub overall_score: Option<i64>,
    pub completeness_score: Option<i64>,
    pub compliance_score: Option<i64>,
    pub risk_level: Option<RiskLevel>,
    pub risk_factors: Option<Vec<RiskFactor>>,
    pub compliance_issues: Option<Vec<ComplianceIssue>>,
    pub analysis_data: Option<AnalysisData>,
}

/// Fields supplied at record creation; everything else is stamped by the store
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub language: String,
}

/// Partial update shallow-merged onto a stored record
///
/// The store applies whatever is `Some` and leaves the rest untouched; it
/// does not police the lifecycle invariant; that is the orchestrator's job.
#[derive(Debug, Clone, Default)]
pub struct AnalysisUpdate {
    pub status: Option<AnalysisStatus>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub extracted_text: Option<String>,
    pub overall_score: Option<i64>,
    pub completeness_score: Option<i64>,
    pub compliance_score: Option<i64>,
    pub risk_level: Option<RiskLevel>,
    pub risk_factors: Option<Vec<RiskFactor>>,
    pub compliance_issues: Option<Vec<ComplianceIssue>>,
    pub analysis_data: Option<AnalysisData>,
}

impl AnalysisUpdate {
    /// Terminal update for a successful analysis
    pub fn completed(extracted_text: String, result: AnalysisResult) -> Self {
        AnalysisUpdate {
            status: Some(AnalysisStatus::Completed),
            analyzed_at: Some(Utc::now()),
            extracted_text: Some(extracted_text),
            overall_score: Some(result.overall_score),
            completeness_score: Some(result.completeness_score),
            compliance_score: Some(result.compliance_score),
            risk_level: Some(result.risk_level),
            risk_factors: Some(result.risk_factors),
            compliance_issues: Some(result.compliance_issues),
            analysis_data: Some(result.analysis_data),
        }
    }

    /// Terminal update for a failed analysis
    pub fn failed(reason: &str) -> Self {
        AnalysisUpdate {
            status: Some(AnalysisStatus::Failed),
            analyzed_at: Some(Utc::now()),
            analysis_data: Some(AnalysisData::failure(reason)),
            ..AnalysisUpdate::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            AnalysisStatus::Processing,
            AnalysisStatus::Completed,
            AnalysisStatus::Failed,
        ] {
            assert_eq!(AnalysisStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AnalysisStatus::parse("queued"), None);
    }

    #[test]
    fn section_scores_serialize_camel_case() {
        let sections = SectionScores {
            technical_specs: 10,
            budget_details: 20,
            timeline: 30,
            environmental: 40,
            safety: 50,
            legal_compliance: 60,
        };
        let json = serde_json::to_value(&sections).unwrap();
        assert_eq!(json["technicalSpecs"], 10);
        assert_eq!(json["legalCompliance"], 60);
        assert_eq!(sections.mean(), 35.0);
    }

    #[test]
    fn failure_payload_has_zeroed_sections() {
        let data = AnalysisData::failure("boom");
        assert_eq!(data.sections, SectionScores::default());
        assert_eq!(data.detailed_findings, vec!["Analysis failed: boom"]);
        assert!(data.recommendations.is_empty());
    }
}
