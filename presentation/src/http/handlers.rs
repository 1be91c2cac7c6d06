//! Route handlers.

use super::AppState;
use super::dto::{AnalyzeRequest, ExportAccepted, HealthResponse, JobStatusResponse, status_url};
use super::error::ApiError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use lens_application::RunAnalysisInput;
use lens_domain::{AnalysisEvent, ExportRequest, JobId, JobStatus};
use std::convert::Infallible;
use tracing::{debug, info};

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let resolver = state.analysis.resolver();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        llm_provider: resolver.default_provider().to_string(),
        llm_model: resolver.default_model(),
    })
}

/// Start an analysis session and stream its events as SSE.
///
/// Validation and model resolution failures are answered with a plain JSON
/// error before the stream opens. Once streaming, failures arrive in-band as
/// an `error` event. A client disconnect drops the stream, which cancels
/// the session.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let input = RunAnalysisInput::parse(
        &body.repo_url,
        body.language.as_deref(),
        body.llm_provider.as_deref(),
        body.llm_model,
    )?;
    let repo = input.repo.to_string();

    let stream = state.analysis.start(input, &state.shutdown)?;
    info!(session_id = stream.session_id(), repo = %repo, "Streaming analysis");

    let events = stream.map(|event| Ok::<_, Infallible>(sse_event(&event)));
    let mut response = Sse::new(events)
        .keep_alive(KeepAlive::new().interval(state.keepalive))
        .into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}

pub(crate) fn sse_event(event: &AnalysisEvent) -> Event {
    Event::default()
        .event(event.kind().as_str())
        .id(event.sequence.to_string())
        .data(event.to_json().to_string())
}

pub async fn submit_export(
    State(state): State<AppState>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExportAccepted>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let job_id = state.exports.submit(request)?.to_string();
    Ok((
        StatusCode::ACCEPTED,
        Json(ExportAccepted {
            status_url: status_url(&job_id),
            job_id,
            status: JobStatus::Pending,
        }),
    ))
}

pub async fn export_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job = JobId::parse(&job_id)
        .and_then(|id| state.exports.status(&id))
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {job_id}")))?;
    Ok(Json(JobStatusResponse::from(&job)))
}

pub async fn download(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    let renderer = state.exports.renderer();
    let not_found = || ApiError::NotFound(format!("Report not found: {file_name}"));

    let path = renderer.artifact_path(&file_name).ok_or_else(not_found)?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(ApiError::Internal(format!("{}: {e}", path.display()))),
    };
    debug!(file = %file_name, bytes = bytes.len(), "Serving report");

    let headers = [
        (header::CONTENT_TYPE, content_type(renderer.format()).to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

fn content_type(format: &str) -> &'static str {
    match format {
        "markdown" => "text/markdown; charset=utf-8",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
