//! Opening the SQLite cache storage.
//!
//! Every handle runs with WAL journaling and foreign keys on, so deleting a
//! row from `cache_stores` drops that store's entries with it.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
                       PRAGMA synchronous=NORMAL;
                       PRAGMA busy_timeout=5000;
                       PRAGMA foreign_keys=ON;";

/// SQLite-backed [`CacheStorage`](super::CacheStorage).
///
/// Queries run on tokio-rusqlite's background thread. Clones share it.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open (or create) the cache database at `path`, creating missing
    /// parent directories, and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::InvalidInput(format!("cannot create {}: {e}", dir.display())))?;
        }

        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        tracing::debug!(path = %path.display(), "opened cache database");
        Self::init(conn).await
    }

    /// Private database that disappears with the handle.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(Error::from)?;
        migrations::run(&conn).await?;
        Ok(Self { conn })
    }
}
