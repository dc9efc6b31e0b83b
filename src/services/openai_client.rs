//! Remote scoring strategy: OpenAI chat-completions client
//!
//! The model's output is untrusted. Whatever JSON comes back is parsed into
//! an all-optional raw shape and then normalized: every numeric clamped into
//! [0,100], invalid enums defaulted to medium, missing sequences to empty.
//! The caller (scoring engine) treats any error here as a signal to fall
//! back to the local heuristic.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::models::{
    AnalysisData, AnalysisResult, ComplianceIssue, RiskFactor, RiskLevel, SectionScores,
};
use crate::services::scoring::ScoringError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-3.5-turbo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Bounded prompt prefix, respecting request payload limits
const MAX_PROMPT_CHARS: usize = 8000;

const SYSTEM_PROMPT: &str = "You are an expert DPR (Detailed Project Report) analyst. \
    Analyze documents thoroughly and provide detailed assessments in valid JSON format.";

/// OpenAI chat-completions client with a bounded request timeout
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        Ok(OpenAiClient {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Score a document via the remote model
    pub async fn analyze(
        &self,
        text: &str,
        filename: &str,
    ) -> Result<AnalysisResult, ScoringError> {
        let prompt = build_prompt(text, filename);
        let body = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": 0.3,
            "max_tokens": 2000,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ScoringError::Api(status.as_u16(), detail));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ScoringError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ScoringError::EmptyResponse)?;

        let raw: RawAnalysisResult = serde_json::from_str(&content)
            .map_err(|e| ScoringError::InvalidResponse(e.to_string()))?;

        Ok(normalize_result(raw))
    }
}

fn build_prompt(text: &str, filename: &str) -> String {
    let truncated = truncate_chars(text, MAX_PROMPT_CHARS);
    let suffix = if text.chars().count() > MAX_PROMPT_CHARS {
        " ...(truncated)"
    } else {
        ""
    };

    format!(
        r#"Analyze this DPR (Detailed Project Report) document and provide a comprehensive assessment:

Document: {filename}
Content: {truncated}{suffix}

Please analyze and return a JSON response with the following structure:
{{
  "overallScore": number (0-100),
  "completenessScore": number (0-100),
  "complianceScore": number (0-100),
  "riskLevel": "low" | "medium" | "high",
  "riskFactors": [
    {{ "category": "string", "description": "string", "level": "low" | "medium" | "high", "probability": number (0-100) }}
  ],
  "complianceIssues": [
    {{ "title": "string", "description": "string", "severity": "low" | "medium" | "high" }}
  ],
  "analysisData": {{
    "sections": {{
      "technicalSpecs": number (0-100),
      "budgetDetails": number (0-100),
      "timeline": number (0-100),
      "environmental": number (0-100),
      "safety": number (0-100),
      "legalCompliance": number (0-100)
    }},
    "detailedFindings": ["string"],
    "recommendations": ["string"],
    "missingElements": ["string"]
  }}
}}

Focus on:
1. Technical specifications completeness
2. Budget and financial details
3. Project timeline and milestones
4. Environmental impact assessment
5. Safety protocols and measures
6. Legal and regulatory compliance
"#
    )
}

/// Truncate at a char boundary, never mid-codepoint
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Untrusted model output: every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAnalysisResult {
    pub overall_score: Option<f64>,
    pub completeness_score: Option<f64>,
    pub compliance_score: Option<f64>,
    pub risk_level: Option<String>,
    pub risk_factors: Option<Vec<RawRiskFactor>>,
    pub compliance_issues: Option<Vec<RawComplianceIssue>>,
    pub analysis_data: Option<RawAnalysisData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRiskFactor {
    pub category: Option<String>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub probability: Option<f64>,
    pub impact: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawComplianceIssue {
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub section: Option<String>,
    pub recommendation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAnalysisData {
    pub sections: Option<RawSections>,
    pub detailed_findings: Option<Vec<String>>,
    pub recommendations: Option<Vec<String>>,
    pub missing_elements: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSections {
    pub technical_specs: Option<f64>,
    pub budget_details: Option<f64>,
    pub timeline: Option<f64>,
    pub environmental: Option<f64>,
    pub safety: Option<f64>,
    pub legal_compliance: Option<f64>,
}

/// Clamp every numeric into [0,100], default invalid enums to medium and
/// missing sequences to empty, so the result always satisfies the Analysis
/// invariants regardless of what the model returned.
pub fn normalize_result(raw: RawAnalysisResult) -> AnalysisResult {
    let raw_sections = raw
        .analysis_data
        .as_ref()
        .and_then(|d| d.sections.as_ref())
        .copied()
        .unwrap_or_default();

    let sections = SectionScores {
        technical_specs: clamp_score(raw_sections.technical_specs),
        budget_details: clamp_score(raw_sections.budget_details),
        timeline: clamp_score(raw_sections.timeline),
        environmental: clamp_score(raw_sections.environmental),
        safety: clamp_score(raw_sections.safety),
        legal_compliance: clamp_score(raw_sections.legal_compliance),
    };

    let risk_factors = raw
        .risk_factors
        .unwrap_or_default()
        .into_iter()
        .map(|f| RiskFactor {
            category: f.category.unwrap_or_default(),
            description: f.description.unwrap_or_default(),
            level: parse_level(f.level.as_deref()),
            probability: clamp_score(f.probability),
            impact: f.impact,
        })
        .collect();

    let compliance_issues = raw
        .compliance_issues
        .unwrap_or_default()
        .into_iter()
        .map(|i| ComplianceIssue {
            title: i.title.unwrap_or_default(),
            description: i.description.unwrap_or_default(),
            severity: parse_level(i.severity.as_deref()),
            section: i.section,
            recommendation: i.recommendation,
        })
        .collect();

    let data = raw.analysis_data.unwrap_or_default();

    AnalysisResult {
        overall_score: clamp_score(raw.overall_score),
        completeness_score: clamp_score(raw.completeness_score),
        compliance_score: clamp_score(raw.compliance_score),
        risk_level: parse_level(raw.risk_level.as_deref()),
        risk_factors,
        compliance_issues,
        analysis_data: AnalysisData {
            sections,
            detailed_findings: data.detailed_findings.unwrap_or_default(),
            recommendations: data.recommendations.unwrap_or_default(),
            missing_elements: data.missing_elements.unwrap_or_default(),
        },
    }
}

fn clamp_score(value: Option<f64>) -> i64 {
    value.unwrap_or(0.0).clamp(0.0, 100.0).round() as i64
}

fn parse_level(value: Option<&str>) -> RiskLevel {
    value
        .and_then(RiskLevel::parse)
        .unwrap_or(RiskLevel::Medium)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_out_of_range_scores() {
        let raw: RawAnalysisResult = serde_json::from_str(
            r#"{
                "overallScore": 140,
                "completenessScore": -20,
                "riskLevel": "catastrophic",
                "analysisData": { "sections": { "technicalSpecs": 250, "safety": -5 } }
            }"#,
        )
        .unwrap();

        let result = normalize_result(raw);
        assert_eq!(result.overall_score, 100);
        assert_eq!(result.completeness_score, 0);
        assert_eq!(result.compliance_score, 0);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.analysis_data.sections.technical_specs, 100);
        assert_eq!(result.analysis_data.sections.safety, 0);
        assert!(result.risk_factors.is_empty());
    }

    #[test]
    fn normalize_defaults_missing_everything() {
        let result = normalize_result(RawAnalysisResult::default());
        assert_eq!(result.overall_score, 0);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.analysis_data.sections, SectionScores::default());
        assert!(result.analysis_data.detailed_findings.is_empty());
    }

    #[test]
    fn normalize_fills_partial_risk_factors() {
        let raw: RawAnalysisResult = serde_json::from_str(
            r#"{ "riskFactors": [ { "category": "Funding", "probability": 830 } ] }"#,
        )
        .unwrap();

        let result = normalize_result(raw);
        assert_eq!(result.risk_factors.len(), 1);
        assert_eq!(result.risk_factors[0].category, "Funding");
        assert_eq!(result.risk_factors[0].probability, 100);
        assert_eq!(result.risk_factors[0].level, RiskLevel::Medium);
        assert!(result.risk_factors[0].impact.is_none());
    }

    #[test]
    fn prompt_truncates_long_documents() {
        let text = "a".repeat(9000);
        let prompt = build_prompt(&text, "big.txt");
        assert!(prompt.contains("...(truncated)"));
        assert!(!prompt.contains(&"a".repeat(8001)));

        let short_prompt = build_prompt("tiny document", "small.txt");
        assert!(!short_prompt.contains("...(truncated)"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 4), "héll");
        assert_eq!(truncate_chars(text, 100), text);
    }
}
