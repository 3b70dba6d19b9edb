//! SQLite save-slot archive for backups of the live save.

use crate::PersistenceError;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Returns the default SQLite URL used for the archive.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/archive.db"
}

/// One archived slot, without its payload.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotInfo {
    pub slot: String,
    pub note: Option<String>,
    /// Epoch milliseconds of the last write.
    pub saved_at: i64,
}

/// Create the directory holding a file-backed SQLite URL.
pub fn ensure_parent_dir(url: &str) -> std::io::Result<()> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Open (creating if needed) and migrate the archive database.
pub async fn init_db(url: &str) -> Result<SqlitePool, PersistenceError> {
    let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    // A single connection keeps `sqlite::memory:` databases alive and shared.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;
    MIGRATOR.run(&pool).await?;
    info!(url, "archive ready");
    Ok(pool)
}

/// Insert or replace a slot.
pub async fn write_slot(
    pool: &SqlitePool,
    slot: &str,
    payload: &str,
    note: Option<&str>,
) -> Result<(), PersistenceError> {
    let saved_at = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        "INSERT INTO saves (slot, payload, note, saved_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT(slot) DO UPDATE SET payload = excluded.payload, \
         note = excluded.note, saved_at = excluded.saved_at",
    )
    .bind(slot)
    .bind(payload)
    .bind(note)
    .bind(saved_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Payload stored in a slot.
pub async fn read_slot(pool: &SqlitePool, slot: &str) -> Result<Option<String>, PersistenceError> {
    let payload = sqlx::query_scalar::<_, String>("SELECT payload FROM saves WHERE slot = ?")
        .bind(slot)
        .fetch_optional(pool)
        .await?;
    Ok(payload)
}

/// All slots ordered by name.
pub async fn list_slots(pool: &SqlitePool) -> Result<Vec<SlotInfo>, PersistenceError> {
    let rows = sqlx::query_as::<_, (String, Option<String>, i64)>(
        "SELECT slot, note, saved_at FROM saves ORDER BY slot",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(slot, note, saved_at)| SlotInfo {
            slot,
            note,
            saved_at,
        })
        .collect())
}
