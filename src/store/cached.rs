use crate::store::{CollectionStore, JsonStore};
use crate::Result;
use anyhow::Context;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Puts a local `JsonStore` cache in front of a remote store so the application keeps working
/// offline.
///
/// - `load` prefers the remote copy and refreshes the cache with it. If the remote cannot be
///   reached, or does not have the collection, the cached copy is served.
/// - `save` always writes the cache first and then the remote. When the upload fails the error is
///   returned, but the cache already holds the new data and a later `sync up` will push it.
#[derive(Debug)]
pub struct CachedStore<R> {
    remote: R,
    cache: JsonStore,
}

impl<R> CachedStore<R>
where
    R: CollectionStore,
{
    pub fn new(remote: R, cache: JsonStore) -> Self {
        Self { remote, cache }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn cache(&self) -> &JsonStore {
        &self.cache
    }
}

#[async_trait::async_trait]
impl<R> CollectionStore for CachedStore<R>
where
    R: CollectionStore,
{
    async fn load(&self, name: &str) -> Result<Option<String>> {
        match self.remote.load(name).await {
            Ok(Some(body)) => {
                self.cache.save(name, &body).await?;
                Ok(Some(body))
            }
            Ok(None) => {
                debug!("'{name}' is not in remote storage, checking the local cache");
                self.cache.load(name).await
            }
            Err(e) => {
                warn!("Unable to load '{name}' from remote storage, using the local cache: {e:#}");
                self.cache.load(name).await
            }
        }
    }

    async fn save(&self, name: &str, body: &str) -> Result<()> {
        self.cache.save(name, body).await?;
        self.remote.save(name, body).await.with_context(|| {
            format!("Saved '{name}' to the local cache but failed to upload it")
        })
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = self.cache.list().await?.into_iter().collect();
        match self.remote.list().await {
            Ok(remote) => names.extend(remote),
            Err(e) => warn!("Unable to list remote storage, listing the local cache only: {e:#}"),
        }
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    /// A remote that is always unreachable.
    struct Offline;

    #[async_trait::async_trait]
    impl CollectionStore for Offline {
        async fn load(&self, _name: &str) -> Result<Option<String>> {
            anyhow::bail!("network is down")
        }

        async fn save(&self, _name: &str, _body: &str) -> Result<()> {
            anyhow::bail!("network is down")
        }

        async fn list(&self) -> Result<Vec<String>> {
            anyhow::bail!("network is down")
        }
    }

    #[tokio::test]
    async fn test_load_refreshes_cache() {
        let tmp = TempDir::new().unwrap();
        let remote = MemoryStore::default();
        remote.save("categories", "[\"remote\"]").await.unwrap();
        let store = CachedStore::new(remote, JsonStore::new(tmp.path()));

        let body = store.load("categories").await.unwrap();
        assert_eq!(body.as_deref(), Some("[\"remote\"]"));
        assert_eq!(
            store.cache().load("categories").await.unwrap().as_deref(),
            Some("[\"remote\"]")
        );
    }

    #[tokio::test]
    async fn test_offline_load_serves_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = JsonStore::new(tmp.path());
        cache.save("transactions", "[\"cached\"]").await.unwrap();
        let store = CachedStore::new(Offline, cache);

        let body = store.load("transactions").await.unwrap();
        assert_eq!(body.as_deref(), Some("[\"cached\"]"));
        assert_eq!(store.list().await.unwrap(), vec!["transactions".to_string()]);
    }

    #[tokio::test]
    async fn test_offline_save_keeps_cache_and_errors() {
        let tmp = TempDir::new().unwrap();
        let store = CachedStore::new(Offline, JsonStore::new(tmp.path()));

        let err = store.save("transactions", "[]").await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to upload"));
        assert_eq!(
            store.cache().load("transactions").await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
