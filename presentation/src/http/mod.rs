//! HTTP API.
//!
//! | Method | Path | |
//! |--------|------|-|
//! | GET | `/api/health` | service and default model info |
//! | POST | `/api/analyze` | SSE stream of analysis events |
//! | POST | `/api/report/export` | submit an export job (202) |
//! | GET | `/api/report/export/{job_id}` | poll a job |
//! | GET | `/api/report/download/{file_name}` | fetch a rendered report |

pub mod dto;
pub mod error;
mod handlers;

use axum::Router;
use axum::routing::{get, post};
use lens_application::{ExportJobQueue, RunAnalysisUseCase};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub analysis: RunAnalysisUseCase,
    pub exports: Arc<ExportJobQueue>,
    /// Interval between SSE keep-alive comments.
    pub keepalive: Duration,
    /// Parent token for every session; cancelled on server shutdown.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(analysis: RunAnalysisUseCase, exports: Arc<ExportJobQueue>) -> Self {
        Self {
            analysis,
            exports,
            keepalive: Duration::from_secs(15),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/report/export", post(handlers::submit_export))
        .route("/api/report/export/{job_id}", get(handlers::export_status))
        .route("/api/report/download/{file_name}", get(handlers::download))
        .with_state(state)
}

/// Serve until the state's shutdown token is cancelled.
///
/// Cancelling the token also cancels every running session, so open SSE
/// streams end and graceful shutdown can complete.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
