//! Independent rule evaluators ("agents") and the consensus step
//!
//! Each agent is a pure function sharing one signature; no evaluator depends
//! on another's output. The aggregator iterates them, degrading any failure
//! to a fixed neutral response, then builds a consensus assessment plus a
//! de-duplicated priority action list.

use crate::models::{RiskLevel, SectionScores};
use crate::services::scoring::ScoringError;

/// Input shared by every evaluator
#[derive(Debug, Clone, Copy)]
pub struct DprContent<'a> {
    pub text: &'a str,
    pub sections: SectionScores,
}

/// One agent's partial assessment
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub agent_name: &'static str,
    pub findings: Vec<String>,
    /// Bounded to [0,100]
    pub score: i64,
    pub severity: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Aggregated multi-agent output
#[derive(Debug, Clone)]
pub struct MultiAgentReport {
    pub agent_responses: Vec<AgentResponse>,
    pub overall_assessment: String,
    pub priority_actions: Vec<String>,
}

type EvaluateFn = fn(&DprContent) -> Result<AgentResponse, ScoringError>;

/// A named evaluator; plain value type, no trait object needed
#[derive(Clone, Copy)]
pub struct Agent {
    pub name: &'static str,
    evaluate: EvaluateFn,
}

impl Agent {
    /// Run the evaluator, degrading failure to the neutral response
    pub fn run(&self, content: &DprContent) -> AgentResponse {
        match (self.evaluate)(content) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(agent = self.name, error = %e, "agent failed, using neutral response");
                neutral_response(self.name)
            }
        }
    }
}

/// Fixed degraded output when an evaluator fails
pub fn neutral_response(name: &'static str) -> AgentResponse {
    AgentResponse {
        agent_name: name,
        findings: vec!["Analysis temporarily unavailable".to_string()],
        score: 50,
        severity: RiskLevel::Medium,
        recommendations: vec!["Manual review recommended".to_string()],
    }
}

/// The standard evaluator set
pub fn default_agents() -> Vec<Agent> {
    vec![
        Agent {
            name: "Compliance Specialist",
            evaluate: evaluate_compliance,
        },
        Agent {
            name: "Financial Analyst",
            evaluate: evaluate_financial,
        },
        Agent {
            name: "Risk Assessment Specialist",
            evaluate: evaluate_risk,
        },
        Agent {
            name: "Executive Summary Specialist",
            evaluate: evaluate_summary,
        },
    ]
}

/// Run all agents and build the consensus
pub fn run_agents(content: &DprContent, agents: &[Agent]) -> MultiAgentReport {
    let agent_responses: Vec<AgentResponse> = agents.iter().map(|a| a.run(content)).collect();
    let (overall_assessment, priority_actions) = build_consensus(&agent_responses);

    MultiAgentReport {
        agent_responses,
        overall_assessment,
        priority_actions,
    }
}

/// Combine agent outputs into one assessment and a priority action list
///
/// Two or more high-severity agents force CRITICAL regardless of average
/// score; otherwise the average buckets into EXCELLENT / ACCEPTABLE /
/// NEEDS REVISION. Actions are the de-duplicated union of recommendations,
/// truncated to the first five in evaluator-then-emission order.
pub fn build_consensus(responses: &[AgentResponse]) -> (String, Vec<String>) {
    let high_severity_count = responses
        .iter()
        .filter(|r| r.severity == RiskLevel::High)
        .count();
    let avg_score = if responses.is_empty() {
        0.0
    } else {
        responses.iter().map(|r| r.score as f64).sum::<f64>() / responses.len() as f64
    };

    let assessment = if high_severity_count >= 2 {
        "CRITICAL: Multiple agents detected severe compliance issues. Immediate review required."
    } else if avg_score >= 80.0 {
        "EXCELLENT: DPR meets high standards across all evaluation criteria."
    } else if avg_score >= 60.0 {
        "ACCEPTABLE: DPR meets basic requirements but has areas for improvement."
    } else {
        "NEEDS REVISION: DPR requires significant improvements before approval."
    };

    let mut actions = Vec::new();
    for response in responses {
        for recommendation in &response.recommendations {
            if !actions.contains(recommendation) {
                actions.push(recommendation.clone());
            }
        }
    }
    actions.truncate(5);

    (assessment.to_string(), actions)
}

fn count_present(text_lowered: &str, terms: &[&str]) -> usize {
    terms
        .iter()
        .filter(|term| text_lowered.contains(*term))
        .count()
}

fn evaluate_compliance(content: &DprContent) -> Result<AgentResponse, ScoringError> {
    let mut findings = Vec::new();
    let mut recommendations = Vec::new();
    let mut score: i64 = 85;

    if content.sections.environmental < 40 {
        findings.push("Missing environmental impact assessment".to_string());
        recommendations.push("Include detailed environmental compliance documentation".to_string());
        score -= 15;
    }

    if content.sections.safety < 40 {
        findings.push("Insufficient safety protocols documentation".to_string());
        recommendations.push("Add comprehensive safety management plan".to_string());
        score -= 10;
    }

    let lowered = content.text.to_lowercase();
    let compliance_keywords = ["approval", "clearance", "permit", "authorization", "compliance"];
    if count_present(&lowered, &compliance_keywords) < 3 {
        findings.push("Limited regulatory compliance documentation".to_string());
        score -= 8;
    }

    let severity = if score < 60 {
        RiskLevel::High
    } else if score < 75 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    if findings.is_empty() {
        findings.push("All major compliance requirements appear to be addressed".to_string());
    }

    Ok(AgentResponse {
        agent_name: "Compliance Specialist",
        findings,
        score: score.max(0),
        severity,
        recommendations,
    })
}

fn evaluate_financial(content: &DprContent) -> Result<AgentResponse, ScoringError> {
    let mut findings = Vec::new();
    let mut recommendations = Vec::new();
    let mut score: i64 = 80;

    if content.sections.budget_details < 50 {
        findings.push("Budget information missing or incomplete".to_string());
        recommendations.push("Provide detailed budget breakdown with cost justifications".to_string());
        score -= 20;
    }

    let lowered = content.text.to_lowercase();
    let financial_terms = ["cost", "budget", "expense", "funding", "allocation"];
    if count_present(&lowered, &financial_terms) < 3 {
        findings.push("Limited financial documentation".to_string());
        score -= 10;
    }

    let severity = if score < 50 {
        RiskLevel::High
    } else if score < 70 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    if findings.is_empty() {
        findings.push("Budget and financial planning appears adequate".to_string());
    }

    Ok(AgentResponse {
        agent_name: "Financial Analyst",
        findings,
        score: score.max(0),
        severity,
        recommendations,
    })
}

fn evaluate_risk(content: &DprContent) -> Result<AgentResponse, ScoringError> {
    let mut findings = Vec::new();
    let mut recommendations = Vec::new();
    let mut score: i64 = 75;

    let lowered = content.text.to_lowercase();

    let risk_keywords = ["risk", "challenge", "mitigation", "contingency", "delay"];
    if count_present(&lowered, &risk_keywords) < 2 {
        findings.push("Insufficient risk assessment documentation".to_string());
        recommendations.push("Include comprehensive risk analysis and mitigation strategies".to_string());
        score -= 15;
    }

    let env_risk_terms = ["flood", "earthquake", "weather", "monsoon", "environmental"];
    if count_present(&lowered, &env_risk_terms) == 0 {
        findings.push("Environmental risk factors not adequately addressed".to_string());
        recommendations.push("Include environmental risk assessment".to_string());
        score -= 8;
    }

    let severity = if score < 55 {
        RiskLevel::High
    } else if score < 70 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    if findings.is_empty() {
        findings.push("Risk assessment appears comprehensive".to_string());
    }

    Ok(AgentResponse {
        agent_name: "Risk Assessment Specialist",
        findings,
        score: score.max(0),
        severity,
        recommendations,
    })
}

fn evaluate_summary(content: &DprContent) -> Result<AgentResponse, ScoringError> {
    let mut findings = Vec::new();
    let mut recommendations = Vec::new();
    let mut score: i64 = 78;

    let lowered = content.text.to_lowercase();

    let structure_sections = ["introduction", "objective", "scope", "methodology", "conclusion"];
    if count_present(&lowered, &structure_sections) < 3 {
        findings.push("Document lacks clear organizational structure".to_string());
        recommendations.push(
            "Include standard DPR sections: Introduction, Objectives, Scope, Implementation Plan"
                .to_string(),
        );
        score -= 12;
    }

    if !lowered.contains("summary") && !lowered.contains("executive") {
        findings.push("Missing executive summary section".to_string());
        recommendations.push("Add executive summary for quick decision-making reference".to_string());
        score -= 8;
    }

    if content.text.split_whitespace().count() < 500 {
        findings.push("Document appears too brief for comprehensive DPR".to_string());
        recommendations.push("Expand documentation with detailed project information".to_string());
        score -= 15;
    }

    let severity = if score < 60 {
        RiskLevel::High
    } else if score < 75 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    if findings.is_empty() {
        findings.push("Document structure and presentation is well-organized".to_string());
    }

    Ok(AgentResponse {
        agent_name: "Executive Summary Specialist",
        findings,
        score: score.max(0),
        severity,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(severity: RiskLevel, score: i64, recommendations: &[&str]) -> AgentResponse {
        AgentResponse {
            agent_name: "Test Agent",
            findings: Vec::new(),
            score,
            severity,
            recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn two_high_severities_force_critical() {
        let responses = [
            response(RiskLevel::High, 95, &[]),
            response(RiskLevel::High, 95, &[]),
            response(RiskLevel::Low, 95, &[]),
            response(RiskLevel::Low, 95, &[]),
        ];
        let (assessment, _) = build_consensus(&responses);
        assert!(assessment.starts_with("CRITICAL"));
    }

    #[test]
    fn high_average_without_high_severities_is_excellent() {
        let responses = [
            response(RiskLevel::Low, 85, &[]),
            response(RiskLevel::Low, 85, &[]),
            response(RiskLevel::Low, 85, &[]),
            response(RiskLevel::Low, 85, &[]),
        ];
        let (assessment, _) = build_consensus(&responses);
        assert!(assessment.starts_with("EXCELLENT"));
    }

    #[test]
    fn middling_and_low_averages_bucket_correctly() {
        let mid = [response(RiskLevel::Low, 65, &[]), response(RiskLevel::Medium, 70, &[])];
        let (assessment, _) = build_consensus(&mid);
        assert!(assessment.starts_with("ACCEPTABLE"));

        let low = [response(RiskLevel::Medium, 40, &[]), response(RiskLevel::Medium, 50, &[])];
        let (assessment, _) = build_consensus(&low);
        assert!(assessment.starts_with("NEEDS REVISION"));
    }

    #[test]
    fn priority_actions_dedupe_and_truncate_to_five() {
        let responses = [
            response(RiskLevel::Low, 80, &["a", "b", "a"]),
            response(RiskLevel::Low, 80, &["b", "c", "d", "e", "f", "g"]),
        ];
        let (_, actions) = build_consensus(&responses);
        assert_eq!(actions, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn weak_document_trips_all_agents() {
        let content = DprContent {
            text: "short note",
            sections: SectionScores::default(),
        };
        let report = run_agents(&content, &default_agents());

        assert_eq!(report.agent_responses.len(), 4);
        for response in &report.agent_responses {
            assert!((0..=100).contains(&response.score));
            assert!(!response.findings.is_empty());
        }
        // Compliance, Risk, and Summary all land below their high thresholds
        assert!(report.overall_assessment.starts_with("CRITICAL"));
        assert!(!report.priority_actions.is_empty());
        assert!(report.priority_actions.len() <= 5);
    }

    #[test]
    fn strong_document_satisfies_agents() {
        let body = "introduction objective scope methodology conclusion executive summary \
                    approval clearance permit authorization compliance cost budget expense \
                    funding allocation risk mitigation contingency environmental weather "
            .repeat(30);
        let content = DprContent {
            text: &body,
            sections: SectionScores {
                technical_specs: 90,
                budget_details: 90,
                timeline: 90,
                environmental: 90,
                safety: 90,
                legal_compliance: 90,
            },
        };
        let report = run_agents(&content, &default_agents());

        // Baseline scores are 85/80/75/78, so a clean document averages 79.5
        assert!(report.overall_assessment.starts_with("ACCEPTABLE"));
        assert!(report.priority_actions.is_empty());
        for response in &report.agent_responses {
            assert_eq!(response.severity, RiskLevel::Low);
        }
    }
}
