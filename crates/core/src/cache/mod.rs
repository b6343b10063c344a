//! Named, versioned response caches.
//!
//! A [`CacheStorage`] holds any number of named cache stores, each mapping a
//! request URL to a captured [`Snapshot`]. Two backends are provided:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, schema migrations
//! - [`MemoryStorage`]: process-local maps, used in tests and for `storage = "memory"`

pub mod connection;
pub mod key;
pub mod memory;
pub mod migrations;
pub mod snapshot;
pub mod stores;

use async_trait::async_trait;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStorage;
pub use snapshot::Snapshot;

/// Storage for named cache stores.
///
/// Entries are keyed by URL and replaced wholesale on `put`, so concurrent
/// writers of the same key leave one complete entry behind.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named store if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), Error>;

    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Names of all stores, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and all of its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Look up `url` in one store.
    async fn match_url(&self, name: &str, url: &str) -> Result<Option<Snapshot>, Error>;

    /// Look up `url` in every store, oldest store first.
    async fn match_any(&self, url: &str) -> Result<Option<Snapshot>, Error>;

    /// Store a snapshot under its URL, creating the store if needed.
    async fn put(&self, name: &str, snapshot: &Snapshot) -> Result<(), Error>;

    /// Remove one entry. Returns whether it existed.
    async fn remove(&self, name: &str, url: &str) -> Result<bool, Error>;

    /// URLs stored in one store.
    async fn entries(&self, name: &str) -> Result<Vec<String>, Error>;
}
