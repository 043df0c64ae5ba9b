//! Inbound HTTP surface.
//!
//! ```text
//! POST /api/analyze   multipart: file, instructions, taskType
//!                     200 { "markdown": ... }
//!                     400 | 500 { "error": ..., "details"?: ... }
//! GET  /health        200 { "status": "ok" }
//! ```
//!
//! The pipeline runs in its own task. If the client disconnects mid-request
//! the handler future is dropped, but the spawned task still reaches the
//! release step, so no uploaded document is left behind.

use crate::analyze::Analyzer;
use crate::error::AnalysisError;
use crate::request::Submission;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    analyzer: Arc<Analyzer>,
}

#[derive(Debug, Serialize)]
struct SuccessBody {
    markdown: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Build the application router.
pub fn router(analyzer: Arc<Analyzer>) -> Router {
    let body_limit = analyzer.config().max_upload_bytes;
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState { analyzer })
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(analyzer: Arc<Analyzer>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(analyzer))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn analyze(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let submission = match read_submission(&mut multipart).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let analyzer = Arc::clone(&state.analyzer);
    let joined = tokio::spawn(async move { analyzer.analyze_submission(submission).await }).await;

    match joined {
        Ok(Ok(output)) => (
            StatusCode::OK,
            Json(SuccessBody {
                markdown: output.markdown,
            }),
        )
            .into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(join_error) => {
            error!("Analysis task aborted: {}", join_error);
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Analysis task aborted".to_string(),
                None,
            )
        }
    }
}

/// Collect the known multipart fields; unknown fields are skipped.
async fn read_submission(multipart: &mut Multipart) -> Result<Submission, Response> {
    let mut submission = Submission::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(json_error(
                    e.status(),
                    "Invalid multipart body".to_string(),
                    Some(e.body_text()),
                ))
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        let read = match name.as_str() {
            "file" | "document" => {
                submission.file_name = field.file_name().map(str::to_string);
                field.bytes().await.map(|b| submission.document = Some(b.to_vec()))
            }
            "instructions" => field.text().await.map(|t| submission.instructions = Some(t)),
            "taskType" | "task_type" => field.text().await.map(|t| submission.task_type = Some(t)),
            _ => Ok(()),
        };
        if let Err(e) = read {
            return Err(json_error(
                e.status(),
                format!("Could not read field '{name}'"),
                Some(e.body_text()),
            ));
        }
    }
    Ok(submission)
}

fn error_response(e: &AnalysisError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_error(status, e.to_string(), e.details())
}

fn json_error(status: StatusCode, error: String, details: Option<String>) -> Response {
    (status, Json(ErrorBody { error, details })).into_response()
}
