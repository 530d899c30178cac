//! Settings routes.

use std::path::Path;

use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vidshelf_common::{Error, SettingKey};
use vidshelf_db::{models::Setting, queries::settings};

use super::{ApiError, AppContext};

pub fn settings_routes() -> Router<AppContext> {
    Router::new()
        .route("/settings", get(list_settings))
        .route(
            "/settings/root_directory",
            get(get_root_directory).post(set_root_directory),
        )
        .route(
            "/settings/short_video_duration",
            get(get_short_video_duration).post(set_short_video_duration),
        )
}

#[derive(Debug, Deserialize)]
pub struct DirectoryPath {
    pub directory_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortVideoDuration {
    /// Threshold in minutes.
    pub minutes: f64,
}

async fn list_settings(State(ctx): State<AppContext>) -> Result<Json<Vec<Setting>>, ApiError> {
    let conn = ctx.conn()?;
    Ok(Json(settings::list_settings(&conn)?))
}

async fn get_root_directory(State(ctx): State<AppContext>) -> Result<Json<Value>, ApiError> {
    let conn = ctx.conn()?;
    let root = settings::get_setting(&conn, SettingKey::RootDirectory)?;
    Ok(Json(json!({ "root_directory": root })))
}

async fn set_root_directory(
    State(ctx): State<AppContext>,
    Json(body): Json<DirectoryPath>,
) -> Result<Json<Value>, ApiError> {
    let path = body.directory_path.trim();
    if path.is_empty() {
        return Err(Error::invalid_input("directory_path must not be empty").into());
    }
    if !Path::new(path).is_dir() {
        return Err(Error::invalid_input(format!("Not a directory: {}", path)).into());
    }

    let conn = ctx.conn()?;
    settings::set_setting(&conn, SettingKey::RootDirectory, path)?;
    tracing::info!(root = %path, "Root directory updated");
    Ok(Json(json!({ "message": "Root directory updated successfully" })))
}

async fn get_short_video_duration(
    State(ctx): State<AppContext>,
) -> Result<Json<ShortVideoDuration>, ApiError> {
    let minutes = ctx.library_settings()?.short_video_minutes;
    Ok(Json(ShortVideoDuration { minutes }))
}

async fn set_short_video_duration(
    State(ctx): State<AppContext>,
    Json(body): Json<ShortVideoDuration>,
) -> Result<Json<Value>, ApiError> {
    if !body.minutes.is_finite() || body.minutes <= 0.0 {
        return Err(Error::invalid_input("minutes must be a positive number").into());
    }

    let conn = ctx.conn()?;
    settings::set_setting(
        &conn,
        SettingKey::ShortVideoDuration,
        &body.minutes.to_string(),
    )?;
    Ok(Json(json!({ "message": "Short video duration updated successfully" })))
}
