//! Schema for the cache storage.
//!
//! Numbered SQL batches from `crates/core/migrations/`, each applied once
//! and recorded in `_migrations`.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Migration list: (version, SQL), applied in order.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_cache_stores.sql"))];

/// Run any pending migrations.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
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
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))
            .map_err(Error::from)?;

        for (version, sql) in MIGRATIONS {
            if *version > current {
                conn.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("{version}: {e}")))?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version, chrono::Utc::now().to_rfc3339()],
                )
                .map_err(Error::from)?;
                tracing::debug!(version, "applied cache migration");
            }
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
