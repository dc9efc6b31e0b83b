//! Analysis API handlers and the upload orchestrator
//!
//! POST /api/analyze validates synchronously, creates the processing record,
//! then spawns a detached extract+score task and returns immediately.
//! Errors inside the detached task never reach the HTTP layer; they become
//! the record's terminal failed state, discoverable on the next poll.

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Analysis, AnalysisStatus, AnalysisUpdate, NewAnalysis, RiskLevel};
use crate::services::{extract_text, validate_dpr_file};
use crate::AppState;

/// How many recent analyses the stats endpoint scans
const STATS_WINDOW: i64 = 100;
const DEFAULT_RECENT_LIMIT: i64 = 10;

/// GET /api/stats response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_analyzed: usize,
    pub compliant: usize,
    pub high_risk: usize,
    pub avg_score: f64,
}

/// POST /api/analyze response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub message: String,
    pub status: AnalysisStatus,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// Upload captured from the multipart request
struct UploadedFile {
    filename: String,
    content_type: String,
    data: Vec<u8>,
}

/// GET /api/stats
///
/// Derived by scanning the most recent 100 analyses; no running counters are
/// maintained.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let recent = db::analyses::list_recent(&state.db, STATS_WINDOW).await?;

    let total_analyzed = recent.len();
    let compliant = recent
        .iter()
        .filter(|a| a.compliance_score.unwrap_or(0) >= 80)
        .count();
    let high_risk = recent
        .iter()
        .filter(|a| a.risk_level == Some(RiskLevel::High))
        .count();
    let avg = if recent.is_empty() {
        0.0
    } else {
        recent
            .iter()
            .map(|a| a.overall_score.unwrap_or(0) as f64)
            .sum::<f64>()
            / recent.len() as f64
    };

    Ok(Json(StatsResponse {
        total_analyzed,
        compliant,
        high_risk,
        avg_score: (avg * 10.0).round() / 10.0,
    }))
}

/// POST /api/analyze
///
/// Multipart form: binary field `dprFile`, optional text field `language`.
pub async fn analyze_dpr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let mut file: Option<UploadedFile> = None;
    let mut language = "en".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart request: {}", e)))?
    {
        match field.name() {
            Some("dprFile") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            Some("language") => {
                language = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read language: {}", e)))?;
            }
            _ => {}
        }
    }

    let Some(file) = file else {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    };

    validate_dpr_file(&file.filename, file.data.len() as u64, &file.content_type)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let new = NewAnalysis {
        filename: file.filename.clone(),
        file_type: file.content_type.clone(),
        file_size: file.data.len() as i64,
        language,
    };
    let analysis = db::analyses::insert_analysis(&state.db, &new).await?;

    tracing::info!(
        analysis_id = %analysis.id,
        filename = %new.filename,
        size = new.file_size,
        "Analysis record created; spawning scoring task"
    );

    let response = AnalyzeResponse {
        analysis_id: analysis.id,
        message: "File uploaded successfully. Analysis in progress.".to_string(),
        status: AnalysisStatus::Processing,
    };

    spawn_analysis_task(state, analysis.id, file);

    Ok(Json(response))
}

/// GET /api/analysis/{id}
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Analysis>> {
    let analysis = db::analyses::get_analysis(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Analysis not found".to_string()))?;

    Ok(Json(analysis))
}

/// GET /api/recent?limit=N
pub async fn get_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Vec<Analysis>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT).max(0);
    let analyses = db::analyses::list_recent(&state.db, limit).await?;

    Ok(Json(analyses))
}

/// DELETE /api/analysis/{id}
pub async fn delete_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let deleted = db::analyses::delete_analysis(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Analysis not found".to_string()));
    }

    tracing::info!(analysis_id = %id, "Analysis deleted");

    Ok(Json(json!({ "message": "Analysis deleted successfully" })))
}

/// Spawn the detached extract+score task for one upload
///
/// The task's error channel routes to the failed-state update; the HTTP
/// response for the upload has already committed to "processing".
fn spawn_analysis_task(state: AppState, id: Uuid, file: UploadedFile) {
    tokio::spawn(async move {
        if let Err(e) = run_analysis(&state, id, &file).await {
            tracing::error!(analysis_id = %id, error = %e, "Analysis task failed");

            match db::analyses::update_analysis(&state.db, id, AnalysisUpdate::failed(&e.to_string()))
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(analysis_id = %id, "Record deleted before failure could be recorded");
                }
                Err(db_err) => {
                    tracing::error!(
                        analysis_id = %id,
                        error = %db_err,
                        "Failed to record analysis failure"
                    );
                }
            }
        }
    });
}

/// Extraction and scoring for one analysis; the terminal completed update
async fn run_analysis(state: &AppState, id: Uuid, file: &UploadedFile) -> anyhow::Result<()> {
    let text = extract_text(&file.data, &file.content_type)?;
    let result = state.engine.score(&text, &file.filename).await;

    db::analyses::update_analysis(&state.db, id, AnalysisUpdate::completed(text, result)).await?;

    tracing::info!(analysis_id = %id, filename = %file.filename, "Analysis completed");
    Ok(())
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/analyze", post(analyze_dpr))
        .route("/api/analysis/:id", get(get_analysis).delete(delete_analysis))
        .route("/api/recent", get(get_recent))
}
