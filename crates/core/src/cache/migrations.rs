//! Schema migrations for the cache database.
//!
//! A `_migrations` table records the highest applied version; pending
//! batches run in order on every open.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Migration list: (version, SQL). Every batch uses `IF NOT EXISTS`.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_cache_storage.sql")),
    (2, include_str!("../../migrations/002_local_storage.sql")),
];

/// Run any pending migrations.
///
/// # Errors
///
/// Returns an error if a migration batch fails to execute.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            conn.execute_batch(sql).map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            conn.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(Error::from)?;
            tracing::debug!(version, "applied cache migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
