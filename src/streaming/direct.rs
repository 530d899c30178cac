//! Direct streaming with HTTP range requests.

use std::io::SeekFrom;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use tokio::fs::File;
use tokio::io::AsyncSeekExt;
use vidshelf_common::{
    paths::{content_type_for, resolve_stored_path},
    Error, VideoId,
};
use vidshelf_db::queries::{settings, videos};

use super::engine::RangeStream;
use super::range::{parse_range, ByteRange};
use crate::server::{ApiError, AppContext};

/// Serve a video's bytes, honouring a single-range `Range` header.
///
/// The range is validated against the file size before the file is opened.
pub async fn stream_video(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id = VideoId::from(id);

    let (video, root) = {
        let conn = ctx.conn()?;
        let video = videos::get_video(&conn, id)?
            .ok_or_else(|| Error::not_found(format!("Video {} not found", id)))?;
        let root = settings::load_library_settings(&conn)?.root_directory;
        (video, root)
    };
    let root = root.ok_or_else(|| Error::not_found("Root directory is not set"))?;
    let path = resolve_stored_path(&root, &video.filepath)
        .ok_or_else(|| Error::not_found(format!("File not found: {}", video.filepath)))?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .ok_or_else(|| Error::not_found(format!("File not found: {}", video.filepath)))?;
    let file_size = metadata.len();

    let requested = headers.get(header::RANGE).map(|h| {
        h.to_str()
            .map_err(|_| Error::range_not_satisfiable("<invalid header>", file_size))
            .and_then(|s| parse_range(s, file_size))
    });
    let (status, range) = match requested {
        Some(parsed) => (StatusCode::PARTIAL_CONTENT, Some(parsed?)),
        None => (StatusCode::OK, ByteRange::full(file_size)),
    };

    let builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type_for(&path))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", ctx.streaming.cache_max_age_secs),
        );

    let Some(range) = range else {
        return builder
            .header(header::CONTENT_LENGTH, "0")
            .body(Body::empty())
            .map_err(|e| Error::internal(e.to_string()).into());
    };

    let mut file = File::open(&path).await?;
    if range.start > 0 {
        file.seek(SeekFrom::Start(range.start)).await?;
    }

    tracing::debug!(
        video_id = %id,
        file = %video.filepath,
        start = range.start,
        end = range.end,
        size = file_size,
        "Streaming video"
    );

    let body = RangeStream::new(file, range, file_size, ctx.streaming, video.filepath).into_body();

    builder
        .header(header::CONTENT_RANGE, range.content_range(file_size))
        .header(header::CONTENT_LENGTH, range.len().to_string())
        .body(body)
        .map_err(|e| Error::internal(e.to_string()).into())
}
