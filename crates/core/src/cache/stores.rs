//! Cache store operations on the SQLite backend.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{CacheStorage, Snapshot};
use crate::Error;

type Row = (String, u16, String, Vec<u8>, String);

fn row_to_snapshot((url, status, headers_json, body, fetched_at): Row) -> Result<Snapshot, Error> {
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    Ok(Snapshot { url, status, headers, body: body.into(), fetched_at })
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_url(&self, name: &str, url: &str) -> Result<Option<Snapshot>, Error> {
        let name = name.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, headers_json, body, fetched_at
                     FROM cache_entries WHERE store_name = ?1 AND url = ?2",
                    params![name, url],
                    read_row,
                );

                match result {
                    Ok(row) => Ok(Some(row_to_snapshot(row)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn match_any(&self, url: &str) -> Result<Option<Snapshot>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let result = conn.query_row(
                    "SELECT e.url, e.status, e.headers_json, e.body, e.fetched_at
                     FROM cache_entries e JOIN cache_stores s ON s.name = e.store_name
                     WHERE e.url = ?1
                     ORDER BY s.rowid LIMIT 1",
                    params![url],
                    read_row,
                );

                match result {
                    Ok(row) => Ok(Some(row_to_snapshot(row)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, name: &str, snapshot: &Snapshot) -> Result<(), Error> {
        let name = name.to_string();
        let snapshot = snapshot.clone();
        let headers_json = serde_json::to_string(&snapshot.headers)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (store_name, url, status, headers_json, body, fetched_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(store_name, url) DO UPDATE SET
                         status = excluded.status,
                         headers_json = excluded.headers_json,
                         body = excluded.body,
                         fetched_at = excluded.fetched_at",
                    params![name, snapshot.url, snapshot.status, headers_json, snapshot.body.as_ref(), snapshot.fetched_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self, name: &str, url: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM cache_entries WHERE store_name = ?1 AND url = ?2", params![name, url])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE store_name = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot(url: &str, body: &str) -> Snapshot {
        Snapshot::new(url, 200, vec![("content-type".into(), "application/javascript".into())], body.to_string())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let snapshot = make_snapshot("https://app.test/static/app.js", "console.log(1)");

        db.put("exam-prep-v1", &snapshot).await.unwrap();

        let hit = db.match_url("exam-prep-v1", &snapshot.url).await.unwrap().unwrap();
        assert_eq!(hit.body, snapshot.body);
        assert_eq!(hit.headers, snapshot.headers);
        assert_eq!(hit.status, 200);
        assert!(db.has("exam-prep-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("exam-prep-v1").await.unwrap();
        assert!(db.match_url("exam-prep-v1", "https://app.test/nope").await.unwrap().is_none());
        assert!(db.match_any("https://app.test/nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("exam-prep-v1").await.unwrap();
        db.put("exam-prep-v1", &make_snapshot("https://app.test/", "shell")).await.unwrap();
        db.open("exam-prep-v1").await.unwrap();

        assert_eq!(db.keys().await.unwrap(), vec!["exam-prep-v1".to_string()]);
        assert_eq!(db.entries("exam-prep-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_replaces_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://app.test/static/app.js";
        db.put("c", &make_snapshot(url, "old")).await.unwrap();
        db.put("c", &make_snapshot(url, "new")).await.unwrap();

        let hit = db.match_url("c", url).await.unwrap().unwrap();
        assert_eq!(hit.body, "new");
        assert_eq!(db.entries("c").await.unwrap(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://app.test/index.html";
        db.put("old", &make_snapshot(url, "v0")).await.unwrap();

        assert!(db.delete("old").await.unwrap());
        assert!(!db.delete("old").await.unwrap());
        assert!(db.match_any(url).await.unwrap().is_none());
        assert!(db.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://app.test/index.html";
        db.put("first", &make_snapshot(url, "one")).await.unwrap();
        db.put("second", &make_snapshot(url, "two")).await.unwrap();

        assert_eq!(db.keys().await.unwrap(), vec!["first".to_string(), "second".to_string()]);
        assert_eq!(db.match_any(url).await.unwrap().unwrap().body, "one");
    }

    #[tokio::test]
    async fn test_remove_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://app.test/manifest.json";
        db.put("c", &make_snapshot(url, "{}")).await.unwrap();

        assert!(db.remove("c", url).await.unwrap());
        assert!(!db.remove("c", url).await.unwrap());
        assert!(db.has("c").await.unwrap());
    }
}
