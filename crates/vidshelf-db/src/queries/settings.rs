//! Settings key-value operations.

use rusqlite::{params, Connection};
use std::path::PathBuf;
use vidshelf_common::{Error, Result, SettingKey};

use crate::models::{LibrarySettings, Setting};

/// Read one setting.
pub fn get_setting(conn: &Connection, key: SettingKey) -> Result<Option<String>> {
    match conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        [key.as_str()],
        |row| row.get(0),
    ) {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Insert or replace one setting.
pub fn set_setting(conn: &Connection, key: SettingKey, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key.as_str(), value],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// List every stored setting, including keys this version does not know.
pub fn list_settings(conn: &Connection) -> Result<Vec<Setting>> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM settings ORDER BY key")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Setting {
                key: row.get(0)?,
                value: row.get(1)?,
            })
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Load the typed library settings.
///
/// An unparsable or non-positive short-video threshold falls back to the
/// default.
pub fn load_library_settings(conn: &Connection) -> Result<LibrarySettings> {
    let mut settings = LibrarySettings::default();

    if let Some(root) = get_setting(conn, SettingKey::RootDirectory)? {
        if !root.trim().is_empty() {
            settings.root_directory = Some(PathBuf::from(root));
        }
    }

    if let Some(minutes) = get_setting(conn, SettingKey::ShortVideoDuration)? {
        if let Ok(minutes) = minutes.trim().parse::<f64>() {
            if minutes > 0.0 {
                settings.short_video_minutes = minutes;
            }
        }
    }

    Ok(settings)
}
