//! Integration tests for the dpr-intake API
//!
//! Covers the full upload→poll lifecycle against an in-memory database with
//! the local scoring strategy: synchronous validation, detached analysis
//! completion and failure, recent listing, deletion, and stats derivation.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`

use dpr_intake::services::ScoringEngine;
use dpr_intake::{build_router, AppState};

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// Test helper: in-memory database pinned to one connection (a pooled
/// `sqlite::memory:` would give each connection its own database)
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    dpr_intake::db::init_tables(&pool).await.expect("table init");
    pool
}

/// Test helper: app with the local scoring strategy
async fn setup_app() -> Router {
    let db = setup_test_db().await;
    let state = AppState::new(db, ScoringEngine::local_only());
    build_router(state)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Multipart upload request with a `dprFile` part and optional `language`
fn upload_request(
    filename: &str,
    content_type: &str,
    data: &[u8],
    language: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"dprFile\"; filename=\"{}\"\r\n\
             Content-Type: {}\r\n\r\n",
            filename, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    if let Some(language) = language {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"language\"\r\n\r\n");
        body.extend_from_slice(language.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Poll GET /api/analysis/{id} until the record leaves "processing"
async fn wait_for_terminal(app: &Router, id: &str) -> Value {
    for _ in 0..250 {
        let response = app
            .clone()
            .oneshot(test_request("GET", &format!("/api/analysis/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = extract_json(response.into_body()).await;
        if body["status"] != "processing" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("analysis never reached a terminal state");
}

async fn upload_and_wait(app: &Router, filename: &str, content_type: &str, data: &[u8]) -> Value {
    let response = app
        .clone()
        .oneshot(upload_request(filename, content_type, data, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let id = body["analysisId"].as_str().expect("analysisId").to_string();
    wait_for_terminal(app, &id).await
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_reports_module() {
    let app = setup_app().await;

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "dpr-intake");
    assert!(body["version"].is_string());
}

// =============================================================================
// Upload validation (synchronous, 400 with {message})
// =============================================================================

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let app = setup_app().await;

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"language\"\r\n\r\nen\r\n");
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    let request = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "No file uploaded");
}

#[tokio::test]
async fn upload_of_unsupported_type_is_rejected() {
    let app = setup_app().await;

    let response = app
        .oneshot(upload_request(
            "report.docx",
            "application/msword",
            b"some bytes",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "Only PDF and TXT files are supported");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = setup_app().await;

    let data = vec![b'a'; 10 * 1024 * 1024 + 1];
    let response = app
        .oneshot(upload_request("big.txt", "text/plain", &data, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "File size exceeds 10MB limit");
}

// =============================================================================
// Upload → detached analysis lifecycle
// =============================================================================

#[tokio::test]
async fn upload_returns_processing_immediately() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(upload_request(
            "report.txt",
            "text/plain",
            b"budget cost timeline safety legal compliance",
            Some("en"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "processing");
    assert_eq!(
        body["message"],
        "File uploaded successfully. Analysis in progress."
    );
    assert!(body["analysisId"].is_string());
}

#[tokio::test]
async fn completed_analysis_carries_bounded_results() {
    let app = setup_app().await;

    let content = "budget cost financial timeline schedule technical design \
                   environment impact safety hazard legal compliance regulation "
        .repeat(20);
    let record = upload_and_wait(&app, "report.txt", "text/plain", content.as_bytes()).await;

    assert_eq!(record["status"], "completed");
    assert!(record["analyzedAt"].is_string());
    assert!(record["extractedText"].is_string());
    assert_eq!(record["language"], "en");

    for key in ["overallScore", "completenessScore", "complianceScore"] {
        let score = record[key].as_i64().unwrap();
        assert!((0..=100).contains(&score), "{} out of bounds", key);
    }
    assert!(["low", "medium", "high"].contains(&record["riskLevel"].as_str().unwrap()));

    let sections = &record["analysisData"]["sections"];
    for key in [
        "technicalSpecs",
        "budgetDetails",
        "timeline",
        "environmental",
        "safety",
        "legalCompliance",
    ] {
        let score = sections[key].as_i64().unwrap();
        assert!((0..=100).contains(&score), "section {} out of bounds", key);
    }
}

#[tokio::test]
async fn genuine_pdf_upload_fails_with_placeholder_results() {
    let app = setup_app().await;

    let mut data = b"%PDF-1.4\n".to_vec();
    data.extend_from_slice(&[0x00, 0x01, 0x02, 0x03]);
    let record = upload_and_wait(&app, "report.pdf", "application/pdf", &data).await;

    assert_eq!(record["status"], "failed");
    assert!(record["analyzedAt"].is_string());
    assert!(record["overallScore"].is_null());

    // Terminal records always carry the six sections, zeroed on failure
    let sections = &record["analysisData"]["sections"];
    for key in [
        "technicalSpecs",
        "budgetDetails",
        "timeline",
        "environmental",
        "safety",
        "legalCompliance",
    ] {
        assert_eq!(sections[key], 0, "section {} not zeroed", key);
    }

    let findings = record["analysisData"]["detailedFindings"]
        .as_array()
        .unwrap();
    assert!(findings[0].as_str().unwrap().starts_with("Analysis failed:"));
}

#[tokio::test]
async fn disguised_text_pdf_is_analyzed() {
    let app = setup_app().await;

    let record = upload_and_wait(
        &app,
        "notes.pdf",
        "application/pdf",
        b"plain text wearing a pdf extension",
    )
    .await;

    assert_eq!(record["status"], "completed");
    assert_eq!(
        record["extractedText"],
        "plain text wearing a pdf extension"
    );
}

// =============================================================================
// Fetch, recent listing, deletion
// =============================================================================

#[tokio::test]
async fn unknown_analysis_returns_404() {
    let app = setup_app().await;
    let id = uuid::Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(test_request("GET", &format!("/api/analysis/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "Analysis not found");

    let response = app
        .oneshot(test_request("DELETE", &format!("/api/analysis/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "Analysis not found");
}

#[tokio::test]
async fn recent_lists_survivors_newest_first_after_deletions() {
    let app = setup_app().await;

    // Five uploads with distinct timestamps
    let mut ids = Vec::new();
    for i in 0..5 {
        let response = app
            .clone()
            .oneshot(upload_request(
                &format!("report-{}.txt", i),
                "text/plain",
                b"short document",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        ids.push(body["analysisId"].as_str().unwrap().to_string());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Delete two of them
    for id in [&ids[1], &ids[3]] {
        let response = app
            .clone()
            .oneshot(test_request("DELETE", &format!("/api/analysis/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["message"], "Analysis deleted successfully");
    }

    let response = app
        .oneshot(test_request("GET", "/api/recent?limit=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listed = extract_json(response.into_body()).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0]["id"], ids[4].as_str());
    assert_eq!(listed[1]["id"], ids[2].as_str());
    assert_eq!(listed[2]["id"], ids[0].as_str());
}

#[tokio::test]
async fn recent_defaults_to_ten() {
    let app = setup_app().await;

    for i in 0..12 {
        let response = app
            .clone()
            .oneshot(upload_request(
                &format!("r{}.txt", i),
                "text/plain",
                b"doc",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let response = app.oneshot(test_request("GET", "/api/recent")).await.unwrap();
    let listed = extract_json(response.into_body()).await;
    assert_eq!(listed.as_array().unwrap().len(), 10);
}

// =============================================================================
// Stats
// =============================================================================

#[tokio::test]
async fn stats_start_empty_and_track_analyses() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["totalAnalyzed"], 0);
    assert_eq!(body["compliant"], 0);
    assert_eq!(body["highRisk"], 0);
    assert_eq!(body["avgScore"], 0.0);

    // A keyword-free document lands in the lowest band: high risk
    let record = upload_and_wait(&app, "weak.txt", "text/plain", b"nothing relevant at all").await;
    assert_eq!(record["status"], "completed");

    let response = app.oneshot(test_request("GET", "/api/stats")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["totalAnalyzed"], 1);
    let avg = body["avgScore"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&avg));
    if record["riskLevel"] == "high" {
        assert_eq!(body["highRisk"], 1);
    }
}
