//! Library scan routes.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::{ApiError, AppContext};
use crate::state::ScanProgress;

pub fn scan_routes() -> Router<AppContext> {
    Router::new()
        .route("/videos/scan", get(start_scan))
        .route("/videos/scan/progress", get(scan_progress))
}

/// Acknowledgment of a scan request.
#[derive(Debug, Serialize)]
pub struct ScanAck {
    pub message: String,
    pub status: &'static str,
}

/// Start a background reconciliation run, or report the one in progress.
async fn start_scan(State(ctx): State<AppContext>) -> Result<Json<ScanAck>, ApiError> {
    let root = ctx.library_settings()?.root_directory;
    let (_, started) = ctx.start_scan(root);

    let message = if started {
        tracing::info!("Library scan started");
        "Scan started"
    } else {
        "Scan already in progress"
    };
    Ok(Json(ScanAck {
        message: message.to_string(),
        status: "processing",
    }))
}

async fn scan_progress(State(ctx): State<AppContext>) -> Json<ScanProgress> {
    Json(
        ctx.scan_tracker()
            .map(|t| t.snapshot())
            .unwrap_or_default(),
    )
}
