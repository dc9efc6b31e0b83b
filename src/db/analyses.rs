//! Analysis store: CRUD + list operations keyed by analysis id
//!
//! Each record receives at most two writes in its lifetime: the initial
//! insert (status=processing) and one terminal merge issued by the detached
//! analysis task. `update_analysis` shallow-merges without validating the
//! transition; lifecycle rules live with the orchestrator.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    Analysis, AnalysisData, AnalysisStatus, AnalysisUpdate, ComplianceIssue, NewAnalysis,
    RiskFactor, RiskLevel,
};

/// Create a new analysis record
///
/// Generates the id, stamps uploaded_at, defaults status to processing with
/// all result columns NULL.
pub async fn insert_analysis(pool: &SqlitePool, new: &NewAnalysis) -> Result<Analysis> {
    let analysis = Analysis {
        id: Uuid::new_v4(),
        filename: new.filename.clone(),
        file_type: new.file_type.clone(),
        file_size: new.file_size,
        status: AnalysisStatus::Processing,
        uploaded_at: Utc::now(),
        analyzed_at: None,
        language: new.language.clone(),
        extracted_text: None,
        overall_score: None,
        completeness_score: None,
        compliance_score: None,
        risk_level: None,
        risk_factors: None,
        compliance_issues: None,
        analysis_data: None,
    };

    sqlx::query(
        r#"
        INSERT INTO dpr_analyses (id, filename, file_type, file_size, status, uploaded_at, language)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(analysis.id.to_string())
    .bind(&analysis.filename)
    .bind(&analysis.file_type)
    .bind(analysis.file_size)
    .bind(analysis.status.as_str())
    .bind(format_timestamp(&analysis.uploaded_at))
    .bind(&analysis.language)
    .execute(pool)
    .await?;

    Ok(analysis)
}

/// Load one analysis by id
pub async fn get_analysis(pool: &SqlitePool, id: Uuid) -> Result<Option<Analysis>> {
    let row = sqlx::query("SELECT * FROM dpr_analyses WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_analysis(&r)).transpose()
}

/// Shallow-merge partial fields onto a stored record
///
/// Returns the merged record, or None if the id does not exist.
pub async fn update_analysis(
    pool: &SqlitePool,
    id: Uuid,
    update: AnalysisUpdate,
) -> Result<Option<Analysis>> {
    let Some(mut analysis) = get_analysis(pool, id).await? else {
        return Ok(None);
    };

    if let Some(status) = update.status {
        analysis.status = status;
    }
    if let Some(analyzed_at) = update.analyzed_at {
        analysis.analyzed_at = Some(analyzed_at);
    }
    if let Some(text) = update.extracted_text {
        analysis.extracted_text = Some(text);
    }
    if let Some(score) = update.overall_score {
        analysis.overall_score = Some(score);
    }
    if let Some(score) = update.completeness_score {
        analysis.completeness_score = Some(score);
    }
    if let Some(score) = update.compliance_score {
        analysis.compliance_score = Some(score);
    }
    if let Some(level) = update.risk_level {
        analysis.risk_level = Some(level);
    }
    if let Some(factors) = update.risk_factors {
        analysis.risk_factors = Some(factors);
    }
    if let Some(issues) = update.compliance_issues {
        analysis.compliance_issues = Some(issues);
    }
    if let Some(data) = update.analysis_data {
        analysis.analysis_data = Some(data);
    }

    let risk_factors = analysis
        .risk_factors
        .as_ref()
        .map(|v| to_json(v))
        .transpose()?;
    let compliance_issues = analysis
        .compliance_issues
        .as_ref()
        .map(|v| to_json(v))
        .transpose()?;
    let analysis_data = analysis
        .analysis_data
        .as_ref()
        .map(|v| to_json(v))
        .transpose()?;

    sqlx::query(
        r#"
        UPDATE dpr_analyses SET
            status = ?,
            analyzed_at = ?,
            extracted_text = ?,
            overall_score = ?,
            completeness_score = ?,
            compliance_score = ?,
            risk_level = ?,
            risk_factors = ?,
            compliance_issues = ?,
            analysis_data = ?
        WHERE id = ?
        "#,
    )
    .bind(analysis.status.as_str())
    .bind(analysis.analyzed_at.as_ref().map(format_timestamp))
    .bind(&analysis.extracted_text)
    .bind(analysis.overall_score)
    .bind(analysis.completeness_score)
    .bind(analysis.compliance_score)
    .bind(analysis.risk_level.map(|l| l.as_str()))
    .bind(risk_factors)
    .bind(compliance_issues)
    .bind(analysis_data)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(Some(analysis))
}

/// List analyses ordered by uploaded_at descending, truncated to `limit`
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Analysis>> {
    let rows = sqlx::query("SELECT * FROM dpr_analyses ORDER BY uploaded_at DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_analysis).collect()
}

/// Delete one analysis; returns true if a record existed
pub async fn delete_analysis(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM dpr_analyses WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// List analyses in a given lifecycle state (unordered)
pub async fn list_by_status(pool: &SqlitePool, status: AnalysisStatus) -> Result<Vec<Analysis>> {
    let rows = sqlx::query("SELECT * FROM dpr_analyses WHERE status = ?")
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_analysis).collect()
}

/// Fixed-width RFC 3339 so lexicographic TEXT ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("Failed to serialize: {}", e)))
}

fn from_json<T: serde::de::DeserializeOwned>(value: Option<String>) -> Result<Option<T>> {
    value
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize: {}", e)))
}

fn row_to_analysis(row: &SqliteRow) -> Result<Analysis> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id).map_err(|e| Error::Internal(format!("Invalid id: {}", e)))?;

    let status: String = row.get("status");
    let status = AnalysisStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Invalid status: {}", status)))?;

    let uploaded_at: String = row.get("uploaded_at");
    let analyzed_at: Option<String> = row.get("analyzed_at");

    let risk_level: Option<String> = row.get("risk_level");
    let risk_level = risk_level
        .map(|s| {
            RiskLevel::parse(&s).ok_or_else(|| Error::Internal(format!("Invalid risk level: {}", s)))
        })
        .transpose()?;

    let risk_factors: Option<Vec<RiskFactor>> = from_json(row.get("risk_factors"))?;
    let compliance_issues: Option<Vec<ComplianceIssue>> = from_json(row.get("compliance_issues"))?;
    let analysis_data: Option<AnalysisData> = from_json(row.get("analysis_data"))?;

    Ok(Analysis {
        id,
        filename: row.get("filename"),
        file_type: row.get("file_type"),
        file_size: row.get("file_size"),
        status,
        uploaded_at: parse_timestamp(&uploaded_at)?,
        analyzed_at: analyzed_at.as_deref().map(parse_timestamp).transpose()?,
        language: row.get("language"),
        extracted_text: row.get("extracted_text"),
        overall_score: row.get("overall_score"),
        completeness_score: row.get("completeness_score"),
        compliance_score: row.get("compliance_score"),
        risk_level,
        risk_factors,
        compliance_issues,
        analysis_data,
    })
}
