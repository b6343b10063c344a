//! In-memory cache storage.
//!
//! Same semantics as the SQLite backend without persistence. Stores keep
//! their creation order so `keys` and `match_any` behave identically.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheStorage, Snapshot};
use crate::Error;

#[derive(Debug, Default)]
struct Store {
    name: String,
    entries: HashMap<String, Snapshot>,
}

/// Process-local cache storage. Cloning shares the underlying stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    stores: Arc<RwLock<Vec<Store>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        if !stores.iter().any(|s| s.name == name) {
            stores.push(Store { name: name.to_string(), entries: HashMap::new() });
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.stores.read().await.iter().any(|s| s.name == name))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.stores.read().await.iter().map(|s| s.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|s| s.name != name);
        Ok(stores.len() != before)
    }

    async fn match_url(&self, name: &str, url: &str) -> Result<Option<Snapshot>, Error> {
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.entries.get(url))
            .cloned())
    }

    async fn match_any(&self, url: &str) -> Result<Option<Snapshot>, Error> {
        let stores = self.stores.read().await;
        Ok(stores.iter().find_map(|s| s.entries.get(url)).cloned())
    }

    async fn put(&self, name: &str, snapshot: &Snapshot) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        let index = match stores.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                stores.push(Store { name: name.to_string(), entries: HashMap::new() });
                stores.len() - 1
            }
        };
        stores[index].entries.insert(snapshot.url.clone(), snapshot.clone());
        Ok(())
    }

    async fn remove(&self, name: &str, url: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        Ok(stores
            .iter_mut()
            .find(|s| s.name == name)
            .is_some_and(|s| s.entries.remove(url).is_some()))
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        let mut urls: Vec<String> = stores
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.entries.keys().cloned().collect())
            .unwrap_or_default();
        urls.sort();
        Ok(urls)
    }
}
