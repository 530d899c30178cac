//! Video catalog operations.
//!
//! Records are keyed by integer id and by `filepath`, which is unique and
//! relative to the library root. Rows written by older versions may still
//! carry an absolute path; lookups accept both forms and scan updates
//! rewrite them to the relative form.

use chrono::Utc;
use rusqlite::{params, Connection};
use vidshelf_common::{DurationFilter, Error, Result, SortBy, VideoId};

use crate::models::{
    format_timestamp, Pagination, ScannedVideo, Video, VideoFilter, VideoPage, WatchProgress,
    UpsertOutcome,
};

pub(crate) const COLS: &str = "id, filename, filepath, size, duration, thumbnail_path,
    thumbnail_generated, is_favorite, web_playable, last_position, watch_progress,
    last_watched_at, is_completed, created_at, updated_at";

/// Multiplier applied to the id in seeded random ordering.
const SHUFFLE_MULTIPLIER: i64 = 2_654_435_761;
/// Multiplier applied to the seed in seeded random ordering.
const SHUFFLE_ADDEND: u128 = 1_103_515_245;
/// Modulus of seeded random ordering.
const SHUFFLE_MODULUS: i64 = 2_147_483_647;

/// Watch progress at or above which a video counts as completed.
pub const COMPLETED_THRESHOLD: f64 = 95.0;

fn map_insert_error(e: rusqlite::Error, filepath: &str) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::conflict(format!("filepath already cataloged: {}", filepath))
        }
        other => Error::database(other.to_string()),
    }
}

/// Insert a new video record.
///
/// Returns [`Error::Conflict`] if a record with the same `filepath` exists.
pub fn create_video(
    conn: &Connection,
    filename: &str,
    filepath: &str,
    size: f64,
    duration: f64,
) -> Result<Video> {
    let now = Utc::now();
    let ts = format_timestamp(now);

    conn.execute(
        "INSERT INTO videos (filename, filepath, size, duration, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![filename, filepath, size, duration, ts],
    )
    .map_err(|e| map_insert_error(e, filepath))?;

    Ok(Video {
        id: VideoId::from(conn.last_insert_rowid()),
        filename: filename.to_string(),
        filepath: filepath.to_string(),
        size,
        duration,
        thumbnail_path: None,
        thumbnail_generated: false,
        is_favorite: false,
        web_playable: true,
        last_position: 0.0,
        watch_progress: 0.0,
        last_watched_at: None,
        is_completed: false,
        created_at: now,
        updated_at: now,
    })
}

/// Get a video by ID.
pub fn get_video(conn: &Connection, id: VideoId) -> Result<Option<Video>> {
    let q = format!("SELECT {COLS} FROM videos WHERE id = ?1");
    match conn.query_row(&q, [id.as_i64()], Video::from_row) {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a video by its root-relative path, or by a legacy absolute path.
///
/// The relative form wins when both exist.
pub fn get_video_by_path(
    conn: &Connection,
    relative: &str,
    legacy_absolute: Option<&str>,
) -> Result<Option<Video>> {
    let q = format!(
        "SELECT {COLS} FROM videos WHERE filepath = ?1 OR filepath = ?2
         ORDER BY CASE WHEN filepath = ?1 THEN 0 ELSE 1 END LIMIT 1"
    );
    let legacy = legacy_absolute.unwrap_or(relative);
    match conn.query_row(&q, params![relative, legacy], Video::from_row) {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List every cataloged video in id order.
pub fn list_all_videos(conn: &Connection) -> Result<Vec<Video>> {
    let q = format!("SELECT {COLS} FROM videos ORDER BY id");
    query_videos(conn, &q, &[])
}

/// Overwrite scan-derived fields of an existing record.
///
/// The stored `filepath` is rewritten to the scanned (relative) form.
pub fn update_scanned_video(conn: &Connection, id: VideoId, scanned: &ScannedVideo) -> Result<()> {
    conn.execute(
        "UPDATE videos SET filename = ?1, filepath = ?2, size = ?3, duration = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            scanned.filename,
            scanned.filepath,
            scanned.size,
            scanned.duration,
            format_timestamp(Utc::now()),
            id.as_i64(),
        ],
    )
    .map_err(|e| map_insert_error(e, &scanned.filepath))?;
    Ok(())
}

/// Insert or update the record for a scanned file.
pub fn upsert_scanned_video(
    conn: &Connection,
    scanned: &ScannedVideo,
    legacy_absolute: Option<&str>,
) -> Result<UpsertOutcome> {
    if let Some(existing) = get_video_by_path(conn, &scanned.filepath, legacy_absolute)? {
        update_scanned_video(conn, existing.id, scanned)?;
        return Ok(UpsertOutcome::Updated(existing.id));
    }
    insert_or_adopt(conn, scanned, legacy_absolute)
}

/// Insert a scanned file, updating the existing record instead when the
/// insert hits the unique `filepath`.
///
/// The reconciler writes inside one IMMEDIATE transaction per batch, so the
/// fallback only fires for writers outside that transaction (a second
/// process on the same database).
fn insert_or_adopt(
    conn: &Connection,
    scanned: &ScannedVideo,
    legacy_absolute: Option<&str>,
) -> Result<UpsertOutcome> {
    match create_video(
        conn,
        &scanned.filename,
        &scanned.filepath,
        scanned.size,
        scanned.duration,
    ) {
        Ok(video) => Ok(UpsertOutcome::Inserted(video.id)),
        Err(Error::Conflict(_)) => {
            let existing = get_video_by_path(conn, &scanned.filepath, legacy_absolute)?
                .ok_or_else(|| Error::not_found(format!("video at {}", scanned.filepath)))?;
            update_scanned_video(conn, existing.id, scanned)?;
            Ok(UpsertOutcome::Updated(existing.id))
        }
        Err(e) => Err(e),
    }
}

/// Delete a video record. Returns whether a row was removed.
pub fn delete_video(conn: &Connection, id: VideoId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM videos WHERE id = ?1", [id.as_i64()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Map a seed to the addend of the seeded shuffle.
///
/// The seed's magnitude is reduced modulo 2^63 and scrambled with a
/// multiply-mod so every seed maps into `[0, 2^31 - 1)`.
pub fn shuffle_scramble(seed: i64) -> i64 {
    let int_seed = u128::from(seed.unsigned_abs()) % (1u128 << 63);
    ((int_seed * SHUFFLE_ADDEND) % SHUFFLE_MODULUS as u128) as i64
}

fn order_clause(filter: &VideoFilter, params_vec: &mut Vec<Box<dyn rusqlite::types::ToSql>>) -> String {
    match filter.sort_by {
        SortBy::Filename => "ORDER BY filename ASC".to_string(),
        SortBy::Duration => "ORDER BY duration DESC".to_string(),
        SortBy::Size => "ORDER BY size DESC".to_string(),
        SortBy::CreatedAt => "ORDER BY created_at DESC".to_string(),
        SortBy::Random => match filter.seed {
            Some(seed) => {
                params_vec.push(Box::new(shuffle_scramble(seed)));
                format!(
                    "ORDER BY ABS((id * {SHUFFLE_MULTIPLIER} + ?) % {SHUFFLE_MODULUS}), id"
                )
            }
            None => "ORDER BY random()".to_string(),
        },
    }
}

fn escape_like(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len() + 2);
    out.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// List videos matching `filter`, one page at a time.
///
/// Duration buckets never include videos whose duration is unknown.
pub fn list_videos(
    conn: &Connection,
    filter: &VideoFilter,
    page: Pagination,
) -> Result<VideoPage> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(keyword) = filter.keyword.as_deref().filter(|k| !k.is_empty()) {
        clauses.push("filename LIKE ? ESCAPE '\\'");
        params_vec.push(Box::new(escape_like(keyword)));
    }
    if let Some(favorite) = filter.favorite {
        clauses.push("is_favorite = ?");
        params_vec.push(Box::new(favorite as i32));
    }
    let threshold_secs = filter.short_video_minutes * 60.0;
    match filter.duration {
        Some(DurationFilter::Short) => {
            clauses.push("duration > 0 AND duration <= ?");
            params_vec.push(Box::new(threshold_secs));
        }
        Some(DurationFilter::Long) => {
            clauses.push("duration > 0 AND duration > ?");
            params_vec.push(Box::new(threshold_secs));
        }
        None => {}
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let count_q = format!("SELECT COUNT(*) FROM videos {where_sql}");
    let count_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|b| b.as_ref()).collect();
    let total: i64 = conn
        .query_row(&count_q, count_refs.as_slice(), |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?;

    let order_sql = order_clause(filter, &mut params_vec);
    params_vec.push(Box::new(i64::from(page.limit)));
    params_vec.push(Box::new(i64::from(page.skip)));

    let q = format!("SELECT {COLS} FROM videos {where_sql} {order_sql} LIMIT ? OFFSET ?");
    let refs: Vec<&dyn rusqlite::types::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
    let items = query_videos(conn, &q, &refs)?;

    Ok(VideoPage::new(total, page.limit, items))
}

fn query_videos(
    conn: &Connection,
    q: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<Video>> {
    let mut stmt = conn.prepare(q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(params, Video::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

fn set_flag(conn: &Connection, column: &str, id: VideoId, value: bool) -> Result<bool> {
    let q = format!("UPDATE videos SET {column} = ?1, updated_at = ?2 WHERE id = ?3");
    let n = conn
        .execute(
            &q,
            params![value as i32, format_timestamp(Utc::now()), id.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Set or clear the favorite flag. Returns whether the video exists.
pub fn set_favorite(conn: &Connection, id: VideoId, is_favorite: bool) -> Result<bool> {
    set_flag(conn, "is_favorite", id, is_favorite)
}

/// Set or clear the web-playable flag. Returns whether the video exists.
pub fn set_web_playable(conn: &Connection, id: VideoId, web_playable: bool) -> Result<bool> {
    set_flag(conn, "web_playable", id, web_playable)
}

/// Record the thumbnail path and whether a file exists there.
pub fn set_thumbnail(
    conn: &Connection,
    id: VideoId,
    thumbnail_path: Option<&str>,
    generated: bool,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE videos SET thumbnail_path = ?1, thumbnail_generated = ?2 WHERE id = ?3",
            params![thumbnail_path, generated as i32, id.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Point a record at its renamed file.
pub fn rename_video(
    conn: &Connection,
    id: VideoId,
    filename: &str,
    filepath: &str,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE videos SET filename = ?1, filepath = ?2, updated_at = ?3 WHERE id = ?4",
            params![filename, filepath, format_timestamp(Utc::now()), id.as_i64()],
        )
        .map_err(|e| map_insert_error(e, filepath))?;
    Ok(n > 0)
}

/// Compute the percentage watched for a position, capped at 100.
///
/// Returns `None` when the duration is unknown.
pub fn progress_percent(last_position: f64, duration: f64) -> Option<f64> {
    if duration > 0.0 {
        Some((last_position / duration * 100.0).min(100.0))
    } else {
        None
    }
}

/// Record a playback position.
///
/// When `watch_progress` is omitted it is derived from the duration (left
/// unchanged if the duration is unknown). When `is_completed` is omitted it
/// is set from [`COMPLETED_THRESHOLD`]. Returns `None` for an unknown id.
pub fn update_progress(
    conn: &Connection,
    id: VideoId,
    last_position: f64,
    watch_progress: Option<f64>,
    is_completed: Option<bool>,
) -> Result<Option<WatchProgress>> {
    let Some(video) = get_video(conn, id)? else {
        return Ok(None);
    };

    let percent = watch_progress
        .or_else(|| progress_percent(last_position, video.duration))
        .unwrap_or(video.watch_progress);
    let completed = is_completed.unwrap_or(percent >= COMPLETED_THRESHOLD);
    let now = Utc::now();

    conn.execute(
        "UPDATE videos SET last_position = ?1, watch_progress = ?2, is_completed = ?3,
                last_watched_at = ?4
         WHERE id = ?5",
        params![
            last_position,
            percent,
            completed as i32,
            format_timestamp(now),
            id.as_i64()
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Some(WatchProgress {
        video_id: id,
        last_position,
        watch_progress: percent,
        last_watched_at: Some(now),
        is_completed: completed,
    }))
}

/// Get the playback position of a video.
pub fn get_progress(conn: &Connection, id: VideoId) -> Result<Option<WatchProgress>> {
    Ok(get_video(conn, id)?.map(|v| v.progress()))
}

/// Reset playback state. Returns whether the video exists.
pub fn clear_progress(conn: &Connection, id: VideoId) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE videos SET last_position = 0, watch_progress = 0, is_completed = 0,
                    last_watched_at = NULL
             WHERE id = ?1",
            [id.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Most recently watched videos first.
pub fn recently_watched(conn: &Connection, limit: u32) -> Result<Vec<Video>> {
    let q = format!(
        "SELECT {COLS} FROM videos WHERE last_watched_at IS NOT NULL
         ORDER BY last_watched_at DESC LIMIT ?1"
    );
    query_videos(conn, &q, &[&i64::from(limit)])
}

/// Started but unfinished videos, most recently watched first.
pub fn continue_watching(conn: &Connection, limit: u32) -> Result<Vec<Video>> {
    let q = format!(
        "SELECT {COLS} FROM videos
         WHERE last_position > 0 AND is_completed = 0 AND last_watched_at IS NOT NULL
         ORDER BY last_watched_at DESC LIMIT ?1"
    );
    query_videos(conn, &q, &[&i64::from(limit)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use vidshelf_common::UNKNOWN_DURATION;

    fn scanned(path: &str, duration: f64) -> ScannedVideo {
        ScannedVideo {
            filename: path.rsplit('/').next().unwrap().to_string(),
            filepath: path.to_string(),
            size: 1.5,
            duration,
        }
    }

    fn seed_videos(conn: &Connection) -> Vec<Video> {
        vec![
            create_video(conn, "b.mp4", "b.mp4", 10.0, 120.0).unwrap(),
            create_video(conn, "a.mkv", "shows/a.mkv", 300.0, 3600.0).unwrap(),
            create_video(conn, "c.avi", "c.avi", 5.0, UNKNOWN_DURATION).unwrap(),
            create_video(conn, "Apple.mp4", "Apple.mp4", 50.0, 300.0).unwrap(),
        ]
    }

    #[test]
    fn test_create_and_get() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let video = create_video(&conn, "clip.mp4", "dir/clip.mp4", 12.34, 95.5).unwrap();
        let fetched = get_video(&conn, video.id).unwrap().unwrap();
        assert_eq!(fetched.filename, "clip.mp4");
        assert_eq!(fetched.filepath, "dir/clip.mp4");
        assert_eq!(fetched.duration, 95.5);
        assert!(fetched.web_playable);
        assert!(!fetched.thumbnail_generated);

        assert!(get_video(&conn, VideoId::from(999)).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_is_conflict() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        create_video(&conn, "a.mp4", "a.mp4", 1.0, 1.0).unwrap();
        let err = create_video(&conn, "a.mp4", "a.mp4", 1.0, 1.0).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_get_by_path_prefers_relative() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let legacy = create_video(&conn, "x.mp4", "/media/x.mp4", 1.0, 1.0).unwrap();
        let found = get_video_by_path(&conn, "x.mp4", Some("/media/x.mp4"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, legacy.id);

        let rel = create_video(&conn, "x.mp4", "x.mp4", 1.0, 1.0).unwrap();
        let found = get_video_by_path(&conn, "x.mp4", Some("/media/x.mp4"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, rel.id);

        assert!(get_video_by_path(&conn, "y.mp4", None).unwrap().is_none());
    }

    #[test]
    fn test_upsert_inserts_then_updates() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let first = upsert_scanned_video(&conn, &scanned("a/b.mp4", 10.0), None).unwrap();
        assert!(matches!(first, UpsertOutcome::Inserted(_)));

        let second = upsert_scanned_video(&conn, &scanned("a/b.mp4", 20.0), None).unwrap();
        assert_eq!(second, UpsertOutcome::Updated(first.id()));

        let all = list_all_videos(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].duration, 20.0);
    }

    #[test]
    fn test_insert_conflict_adopts_existing_record() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        // Another writer cataloged the file after our lookup missed it.
        let winner = create_video(&conn, "b.mp4", "a/b.mp4", 1.0, 1.0).unwrap();
        assert!(matches!(
            create_video(&conn, "b.mp4", "a/b.mp4", 1.0, 1.0),
            Err(Error::Conflict(_))
        ));

        let outcome = insert_or_adopt(&conn, &scanned("a/b.mp4", 30.0), None).unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated(winner.id));

        let all = list_all_videos(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].duration, 30.0);
    }

    #[test]
    fn test_upsert_rewrites_legacy_path() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let legacy = create_video(&conn, "b.mp4", "/media/a/b.mp4", 1.0, 1.0).unwrap();
        let outcome =
            upsert_scanned_video(&conn, &scanned("a/b.mp4", 5.0), Some("/media/a/b.mp4")).unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated(legacy.id));

        let video = get_video(&conn, legacy.id).unwrap().unwrap();
        assert_eq!(video.filepath, "a/b.mp4");
    }

    #[test]
    fn test_upsert_keeps_unknown_duration() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let outcome =
            upsert_scanned_video(&conn, &scanned("broken.mkv", UNKNOWN_DURATION), None).unwrap();
        let video = get_video(&conn, outcome.id()).unwrap().unwrap();
        assert_eq!(video.duration, UNKNOWN_DURATION);
    }

    #[test]
    fn test_delete_video() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let video = create_video(&conn, "a.mp4", "a.mp4", 1.0, 1.0).unwrap();
        assert!(delete_video(&conn, video.id).unwrap());
        assert!(!delete_video(&conn, video.id).unwrap());
        assert!(get_video(&conn, video.id).unwrap().is_none());
    }

    #[test]
    fn test_list_sorting() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        seed_videos(&conn);

        let page = list_videos(&conn, &VideoFilter::default(), Pagination::default()).unwrap();
        let names: Vec<_> = page.items.iter().map(|v| v.filename.as_str()).collect();
        assert_eq!(names, vec!["Apple.mp4", "a.mkv", "b.mp4", "c.avi"]);

        let filter = VideoFilter {
            sort_by: SortBy::Size,
            ..Default::default()
        };
        let page = list_videos(&conn, &filter, Pagination::default()).unwrap();
        assert_eq!(page.items[0].filename, "a.mkv");
    }

    #[test]
    fn test_list_keyword_and_favorite() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let videos = seed_videos(&conn);
        set_favorite(&conn, videos[0].id, true).unwrap();

        let filter = VideoFilter {
            keyword: Some("APP".to_string()),
            ..Default::default()
        };
        let page = list_videos(&conn, &filter, Pagination::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].filename, "Apple.mp4");

        let filter = VideoFilter {
            keyword: Some("%".to_string()),
            ..Default::default()
        };
        assert_eq!(list_videos(&conn, &filter, Pagination::default()).unwrap().total, 0);

        let filter = VideoFilter {
            favorite: Some(true),
            ..Default::default()
        };
        let page = list_videos(&conn, &filter, Pagination::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, videos[0].id);
    }

    #[test]
    fn test_duration_buckets_exclude_unknown() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        seed_videos(&conn);

        let short = VideoFilter {
            duration: Some(DurationFilter::Short),
            short_video_minutes: 5.0,
            ..Default::default()
        };
        let page = list_videos(&conn, &short, Pagination::default()).unwrap();
        let names: Vec<_> = page.items.iter().map(|v| v.filename.as_str()).collect();
        assert_eq!(names, vec!["Apple.mp4", "b.mp4"]);

        let long = VideoFilter {
            duration: Some(DurationFilter::Long),
            short_video_minutes: 5.0,
            ..Default::default()
        };
        let page = list_videos(&conn, &long, Pagination::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].filename, "a.mkv");
    }

    #[test]
    fn test_pagination() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        seed_videos(&conn);

        let page = list_videos(
            &conn,
            &VideoFilter::default(),
            Pagination { skip: 2, limit: 3 },
        )
        .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].filename, "b.mp4");
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        for i in 0..20 {
            let name = format!("v{i}.mp4");
            create_video(&conn, &name, &name, 1.0, 1.0).unwrap();
        }

        let filter = VideoFilter {
            sort_by: SortBy::Random,
            seed: Some(42),
            ..Default::default()
        };
        let page = Pagination { skip: 0, limit: 20 };
        let a: Vec<_> = list_videos(&conn, &filter, page).unwrap().items.into_iter().map(|v| v.id).collect();
        let b: Vec<_> = list_videos(&conn, &filter, page).unwrap().items.into_iter().map(|v| v.id).collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);

        // The order follows the shuffle key computed outside SQL.
        let scramble = shuffle_scramble(42);
        let mut expected: Vec<i64> = (1..=20).collect();
        expected.sort_by_key(|id| ((id * SHUFFLE_MULTIPLIER + scramble) % SHUFFLE_MODULUS).abs());
        let got: Vec<i64> = a.iter().map(|id| id.as_i64()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_shuffle_scramble() {
        assert_eq!(shuffle_scramble(0), 0);
        assert_eq!(shuffle_scramble(1), 1_103_515_245);
        assert_eq!(shuffle_scramble(-1), shuffle_scramble(1));
        assert_eq!(shuffle_scramble(2), (2 * 1_103_515_245) % 2_147_483_647);
        assert_eq!(shuffle_scramble(i64::MIN), 0);
        assert!(shuffle_scramble(i64::MAX) < SHUFFLE_MODULUS);
    }

    #[test]
    fn test_flags_and_thumbnail() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let video = create_video(&conn, "a.mp4", "a.mp4", 1.0, 1.0).unwrap();

        assert!(set_web_playable(&conn, video.id, false).unwrap());
        assert!(set_thumbnail(&conn, video.id, Some("thumbs/a_thumb.jpg"), true).unwrap());
        assert!(!set_favorite(&conn, VideoId::from(404), true).unwrap());

        let video = get_video(&conn, video.id).unwrap().unwrap();
        assert!(!video.web_playable);
        assert!(video.thumbnail_generated);
        assert_eq!(video.thumbnail_path.as_deref(), Some("thumbs/a_thumb.jpg"));
    }

    #[test]
    fn test_rename_video() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let video = create_video(&conn, "a.mp4", "dir/a.mp4", 1.0, 1.0).unwrap();
        create_video(&conn, "b.mp4", "dir/b.mp4", 1.0, 1.0).unwrap();

        assert!(rename_video(&conn, video.id, "c.mp4", "dir/c.mp4").unwrap());
        let video = get_video(&conn, video.id).unwrap().unwrap();
        assert_eq!(video.filepath, "dir/c.mp4");

        let err = rename_video(&conn, video.id, "b.mp4", "dir/b.mp4").unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_progress_auto_computed() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let video = create_video(&conn, "a.mp4", "a.mp4", 1.0, 200.0).unwrap();

        let p = update_progress(&conn, video.id, 50.0, None, None).unwrap().unwrap();
        assert_eq!(p.watch_progress, 25.0);
        assert!(!p.is_completed);
        assert!(p.last_watched_at.is_some());

        let p = update_progress(&conn, video.id, 195.0, None, None).unwrap().unwrap();
        assert!(p.is_completed);

        let p = update_progress(&conn, video.id, 500.0, None, Some(false)).unwrap().unwrap();
        assert_eq!(p.watch_progress, 100.0);
        assert!(!p.is_completed);

        assert!(update_progress(&conn, VideoId::from(404), 1.0, None, None).unwrap().is_none());
    }

    #[test]
    fn test_progress_unknown_duration() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let video = create_video(&conn, "a.mp4", "a.mp4", 1.0, UNKNOWN_DURATION).unwrap();

        let p = update_progress(&conn, video.id, 30.0, None, None).unwrap().unwrap();
        assert_eq!(p.watch_progress, 0.0);
        assert_eq!(p.last_position, 30.0);

        let p = update_progress(&conn, video.id, 30.0, Some(40.0), None).unwrap().unwrap();
        assert_eq!(p.watch_progress, 40.0);
    }

    #[test]
    fn test_recent_and_continue() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let videos = seed_videos(&conn);

        update_progress(&conn, videos[0].id, 10.0, None, None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        update_progress(&conn, videos[1].id, 3600.0, None, None).unwrap();

        let recent = recently_watched(&conn, 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, videos[1].id);

        let cont = continue_watching(&conn, 10).unwrap();
        assert_eq!(cont.len(), 1);
        assert_eq!(cont[0].id, videos[0].id);

        assert!(clear_progress(&conn, videos[0].id).unwrap());
        assert!(continue_watching(&conn, 10).unwrap().is_empty());
        assert_eq!(recently_watched(&conn, 10).unwrap().len(), 1);
    }
}
