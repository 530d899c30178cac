//! Video catalog routes.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use vidshelf_common::{
    paths::{relative_to_root, resolve_stored_path},
    DurationFilter, Error, SortBy, VideoId,
};
use vidshelf_db::{
    models::{Pagination, Video, VideoFilter, VideoPage, WatchProgress},
    queries::videos,
};

use super::{ApiError, AppContext};
use crate::files;
use crate::scanner::CleanupStats;
use crate::streaming;

/// Largest page a listing returns.
const MAX_PAGE_SIZE: u32 = 100;

pub fn video_routes() -> Router<AppContext> {
    Router::new()
        .route("/videos/list", get(list_videos))
        .route("/videos/recent", get(recently_watched))
        .route("/videos/continue", get(continue_watching))
        .route("/videos/thumbnails/cleanup", post(cleanup_thumbnails))
        .route(
            "/videos/:id",
            get(get_video).put(rename_video).delete(delete_video),
        )
        .route("/videos/:id/favorite", post(set_favorite))
        .route("/videos/:id/web_playable", post(set_web_playable))
        .route(
            "/videos/:id/progress",
            get(get_progress).post(update_progress).delete(clear_progress),
        )
        .route(
            "/videos/:id/thumbnail",
            get(get_thumbnail).put(upload_thumbnail),
        )
        .route("/videos/:id/stream", get(streaming::stream_video))
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub keyword: Option<String>,
    pub favorite: Option<bool>,
    pub duration: Option<DurationFilter>,
    #[serde(default)]
    pub sort_by: SortBy,
    pub seed: Option<i64>,
}

fn default_limit() -> u32 {
    Pagination::default().limit
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteQuery {
    pub is_favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct WebPlayableQuery {
    pub web_playable: bool,
}

#[derive(Debug, Deserialize)]
pub struct RenameQuery {
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub last_position: f64,
    pub watch_progress: Option<f64>,
    pub is_completed: Option<bool>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_videos(
    State(ctx): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<VideoPage>, ApiError> {
    let conn = ctx.conn()?;
    let short_video_minutes =
        vidshelf_db::queries::settings::load_library_settings(&conn)?.short_video_minutes;

    let filter = VideoFilter {
        keyword: query.keyword,
        favorite: query.favorite,
        duration: query.duration,
        short_video_minutes,
        sort_by: query.sort_by,
        seed: query.seed,
    };
    let page = Pagination {
        skip: query.skip,
        limit: query.limit.clamp(1, MAX_PAGE_SIZE),
    };
    Ok(Json(videos::list_videos(&conn, &filter, page)?))
}

async fn recently_watched(
    State(ctx): State<AppContext>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Video>>, ApiError> {
    let conn = ctx.conn()?;
    Ok(Json(videos::recently_watched(
        &conn,
        query.limit.clamp(1, MAX_PAGE_SIZE),
    )?))
}

async fn continue_watching(
    State(ctx): State<AppContext>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Video>>, ApiError> {
    let conn = ctx.conn()?;
    Ok(Json(videos::continue_watching(
        &conn,
        query.limit.clamp(1, MAX_PAGE_SIZE),
    )?))
}

fn load_video(ctx: &AppContext, id: VideoId) -> Result<Video, ApiError> {
    let conn = ctx.conn()?;
    videos::get_video(&conn, id)?
        .ok_or_else(|| Error::not_found(format!("Video {} not found", id)).into())
}

async fn get_video(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Video>, ApiError> {
    Ok(Json(load_video(&ctx, VideoId::from(id))?))
}

async fn set_favorite(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    Query(query): Query<FavoriteQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = VideoId::from(id);
    let conn = ctx.conn()?;
    if !videos::set_favorite(&conn, id, query.is_favorite)? {
        return Err(Error::not_found(format!("Video {} not found", id)).into());
    }
    Ok(Json(
        json!({ "message": "Video favorite status updated successfully" }),
    ))
}

async fn set_web_playable(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    Query(query): Query<WebPlayableQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = VideoId::from(id);
    let conn = ctx.conn()?;
    if !videos::set_web_playable(&conn, id, query.web_playable)? {
        return Err(Error::not_found(format!("Video {} not found", id)).into());
    }
    Ok(Json(
        json!({ "message": "Video web playable status updated successfully" }),
    ))
}

/// Reject names that would move the file out of its directory.
fn validate_new_name(name: &str) -> Result<&str, Error> {
    let name = name.trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::invalid_input("new_name must be a file name"));
    }
    if name.contains(['/', '\\']) {
        return Err(Error::invalid_input(
            "new_name must not contain path separators",
        ));
    }
    Ok(name)
}

async fn rename_video(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    Query(query): Query<RenameQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = VideoId::from(id);
    let new_name = validate_new_name(&query.new_name)?;
    let video = load_video(&ctx, id)?;
    let root = ctx
        .library_settings()?
        .root_directory
        .ok_or_else(|| Error::not_found("Root directory is not set"))?;

    let current = resolve_stored_path(&root, &video.filepath)
        .filter(|p| p.is_file())
        .ok_or_else(|| Error::not_found(format!("Video file not found: {}", video.filepath)))?;
    let target = current.with_file_name(new_name);
    let new_relative = relative_to_root(&root, &target)
        .ok_or_else(|| Error::invalid_input("Target lies outside the root directory"))?;

    files::rename_with_retry(&current, &target).await?;

    let updated = {
        let conn = ctx.conn()?;
        videos::rename_video(&conn, id, new_name, &new_relative)
    };
    if let Err(e) = updated {
        // Keep disk and catalog consistent.
        if let Err(undo) = files::rename_with_retry(&target, &current).await {
            tracing::error!(video_id = %id, error = %undo, "Failed to undo rename");
        }
        return Err(e.into());
    }

    tracing::info!(video_id = %id, from = %video.filepath, to = %new_relative, "Renamed video");
    Ok(Json(json!({ "message": "Video renamed successfully" })))
}

async fn delete_video(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let id = VideoId::from(id);
    let video = load_video(&ctx, id)?;
    let root = ctx
        .library_settings()?
        .root_directory
        .ok_or_else(|| Error::not_found("Root directory is not set"))?;
    let path = resolve_stored_path(&root, &video.filepath)
        .ok_or_else(|| Error::not_found(format!("Video file not found: {}", video.filepath)))?;

    files::safe_remove(&path).await?;

    if let Err(e) = ctx.thumbnails().remove_for(&video) {
        tracing::warn!(video_id = %id, error = %e, "Failed to remove thumbnail");
    }

    let conn = ctx.conn()?;
    videos::delete_video(&conn, id)?;
    tracing::info!(video_id = %id, file = %video.filepath, "Deleted video");
    Ok(Json(json!({ "message": "Video deleted successfully" })))
}

async fn get_progress(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<WatchProgress>, ApiError> {
    let id = VideoId::from(id);
    let conn = ctx.conn()?;
    videos::get_progress(&conn, id)?
        .map(Json)
        .ok_or_else(|| Error::not_found(format!("Video {} not found", id)).into())
}

async fn update_progress(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    Json(body): Json<ProgressUpdate>,
) -> Result<Json<WatchProgress>, ApiError> {
    let id = VideoId::from(id);
    if !body.last_position.is_finite() || body.last_position < 0.0 {
        return Err(Error::invalid_input("last_position must be a non-negative number").into());
    }
    if let Some(p) = body.watch_progress {
        if !(0.0..=100.0).contains(&p) {
            return Err(Error::invalid_input("watch_progress must be between 0 and 100").into());
        }
    }

    let conn = ctx.conn()?;
    videos::update_progress(
        &conn,
        id,
        body.last_position,
        body.watch_progress,
        body.is_completed,
    )?
    .map(Json)
    .ok_or_else(|| Error::not_found(format!("Video {} not found", id)).into())
}

async fn clear_progress(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let id = VideoId::from(id);
    let conn = ctx.conn()?;
    if !videos::clear_progress(&conn, id)? {
        return Err(Error::not_found(format!("Video {} not found", id)).into());
    }
    Ok(Json(json!({ "message": "Watch progress cleared" })))
}

fn jpeg(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()
}

/// Serve the stored thumbnail, generating one on demand.
async fn get_thumbnail(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let id = VideoId::from(id);
    let video = load_video(&ctx, id)?;

    if video.thumbnail_generated {
        if let Some(path) = ctx.thumbnails().existing(&video) {
            return Ok(jpeg(tokio::fs::read(&path).await?));
        }
    }

    let root = ctx
        .library_settings()?
        .root_directory
        .ok_or_else(|| Error::not_found("Root directory is not set"))?;
    let source = resolve_stored_path(&root, &video.filepath)
        .filter(|p| p.is_file())
        .ok_or_else(|| Error::not_found(format!("Video file not found: {}", video.filepath)))?;

    let store = ctx.thumbnails().clone();
    let grab = ctx.frame_grab.clone();
    let record = video.clone();
    let generated = tokio::task::spawn_blocking(move || {
        let name = store.generate(&record, &source, &grab)?;
        let bytes = std::fs::read(store.resolve(&name))?;
        Ok::<_, anyhow::Error>((name, bytes))
    })
    .await
    .map_err(|e| Error::internal(e.to_string()))?;

    let conn = ctx.conn()?;
    match generated {
        Ok((name, bytes)) => {
            videos::set_thumbnail(&conn, id, Some(&name), true)?;
            tracing::info!(video_id = %id, thumbnail = %name, "Generated thumbnail");
            Ok(jpeg(bytes))
        }
        Err(e) => {
            tracing::error!(video_id = %id, error = %format!("{:#}", e), "Failed to generate thumbnail");
            videos::set_thumbnail(&conn, id, video.thumbnail_path.as_deref(), false)?;
            Err(Error::internal("Failed to generate thumbnail").into())
        }
    }
}

/// Store an uploaded image as the video's thumbnail.
async fn upload_thumbnail(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let id = VideoId::from(id);
    let is_image = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(Error::invalid_input("File must be an image").into());
    }
    if body.is_empty() {
        return Err(Error::invalid_input("Image is empty").into());
    }

    let video = load_video(&ctx, id)?;
    let store = ctx.thumbnails().clone();
    let record = video.clone();
    let name = tokio::task::spawn_blocking(move || store.store_upload(&record, &body))
        .await
        .map_err(|e| Error::internal(e.to_string()))??;

    let conn = ctx.conn()?;
    videos::set_thumbnail(&conn, id, Some(&name), true)?;
    tracing::info!(video_id = %id, thumbnail = %name, "Stored uploaded thumbnail");
    Ok(Json(json!({
        "message": "Thumbnail updated successfully",
        "thumbnail_path": name,
    })))
}

async fn cleanup_thumbnails(
    State(ctx): State<AppContext>,
) -> Result<Json<CleanupStats>, ApiError> {
    Ok(Json(ctx.reconciler.collect_orphans().await?))
}
