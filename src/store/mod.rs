//! Named-collection persistence.
//!
//! Every piece of data is kept in a named collection: an ordered JSON array of records. The
//! `CollectionStore` trait is the only thing the ledger and the book know about persistence;
//! whether the bytes end up in a JSON file, a SQLite row or a Google Drive file is decided here.

mod cached;
mod drive;
mod json;
mod memory;

pub use cached::CachedStore;
pub(crate) use drive::DriveStore;
pub use json::JsonStore;
pub use memory::MemoryStore;

use crate::api::Mode;
use crate::db::Db;
use crate::{Config, Result, StorageKind};
use anyhow::{ensure, Context};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Collection holding every `Transaction`.
pub const TRANSACTIONS: &str = "transactions";
/// Collection holding every `Category`.
pub const CATEGORIES: &str = "categories";
/// Collection holding every `CategoryBalance`.
pub const CATEGORY_BALANCES: &str = "category_balances";
/// Collection holding every `CategoryDistribution`.
pub const CATEGORY_DISTRIBUTIONS: &str = "category_distributions";

/// All collections the application reads and writes.
pub const COLLECTIONS: &[&str] = &[
    TRANSACTIONS,
    CATEGORIES,
    CATEGORY_BALANCES,
    CATEGORY_DISTRIBUTIONS,
];

/// A key-value blob store: collection name -> serialized body.
#[async_trait::async_trait]
pub trait CollectionStore: Send + Sync {
    /// Returns the body of the collection, or `None` if it has never been saved.
    async fn load(&self, name: &str) -> Result<Option<String>>;

    /// Replaces the body of the collection.
    async fn save(&self, name: &str, body: &str) -> Result<()>;

    /// Returns the names of all collections that exist in the store.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Loads a collection as an ordered list of records. An absent collection is empty.
pub async fn load_records<T>(store: &dyn CollectionStore, name: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    match store.load(name).await? {
        None => {
            debug!("Collection '{name}' does not exist yet, starting empty");
            Ok(Vec::new())
        }
        Some(body) if body.trim().is_empty() => Ok(Vec::new()),
        Some(body) => serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse the '{name}' collection")),
    }
}

/// Saves an ordered list of records as a collection.
pub async fn save_records<T>(store: &dyn CollectionStore, name: &str, records: &[T]) -> Result<()>
where
    T: Serialize,
{
    let body = serde_json::to_string_pretty(records)
        .with_context(|| format!("Failed to serialize the '{name}' collection"))?;
    store.save(name, &body).await
}

/// Collection names become file names, so they are restricted to a safe alphabet.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    ensure!(
        !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-'),
        "Invalid collection name '{name}'"
    );
    Ok(())
}

/// A point-in-time copy of every known collection, used for backups and sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    collections: BTreeMap<String, serde_json::Value>,
}

impl Snapshot {
    /// Reads every collection in `COLLECTIONS` that exists in `store`.
    pub async fn take(store: &dyn CollectionStore) -> Result<Self> {
        let mut collections = BTreeMap::new();
        for &name in COLLECTIONS {
            if let Some(body) = store.load(name).await? {
                let value = serde_json::from_str(&body)
                    .with_context(|| format!("The '{name}' collection is not valid JSON"))?;
                collections.insert(name.to_string(), value);
            }
        }
        Ok(Self { collections })
    }

    /// Writes every collection held by the snapshot into `store`.
    pub async fn restore(&self, store: &dyn CollectionStore) -> Result<usize> {
        for (name, value) in &self.collections {
            let body = serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize the '{name}' collection"))?;
            store.save(name, &body).await?;
        }
        Ok(self.collections.len())
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(|s| s.as_str())
    }
}

/// Opens the store the application reads and writes through, as chosen in the config.
pub async fn open(config: &Config, mode: Mode) -> Result<Arc<dyn CollectionStore>> {
    debug!("Opening {} storage", config.storage());
    Ok(match config.storage() {
        StorageKind::Local => Arc::new(JsonStore::new(config.data_dir())),
        StorageKind::Sqlite => Arc::new(Db::load(config.sqlite_path()).await?),
        StorageKind::Drive => {
            let remote = DriveStore::new(crate::api::drive(config, mode).await?);
            Arc::new(CachedStore::new(remote, JsonStore::new(config.data_dir())))
        }
    })
}

/// Opens the on-machine store: the JSON data directory (which is also the Drive cache) or the
/// SQLite file.
pub(crate) async fn open_local(config: &Config) -> Result<Arc<dyn CollectionStore>> {
    Ok(match config.storage() {
        StorageKind::Sqlite => Arc::new(Db::load(config.sqlite_path()).await?),
        StorageKind::Local | StorageKind::Drive => Arc::new(JsonStore::new(config.data_dir())),
    })
}

/// Opens the Google Drive store without a cache in front of it.
pub(crate) async fn open_remote(config: &Config, mode: Mode) -> Result<DriveStore> {
    Ok(DriveStore::new(crate::api::drive(config, mode).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoryBalance;
    use crate::model::Month;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_absent_collection_is_empty() {
        let store = MemoryStore::default();
        let records: Vec<CategoryBalance> = load_records(&store, CATEGORY_BALANCES)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_records_keep_their_order() {
        let store = MemoryStore::default();
        let month = Month::from_str("2024-01").unwrap();
        let records = vec![
            CategoryBalance::new("Rent", month, Decimal::from(900)),
            CategoryBalance::new("Groceries", month, Decimal::from(170)),
        ];
        save_records(&store, CATEGORY_BALANCES, &records)
            .await
            .unwrap();
        let loaded: Vec<CategoryBalance> = load_records(&store, CATEGORY_BALANCES)
            .await
            .unwrap();
        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn test_load_records_reports_bad_json() {
        let store = MemoryStore::default();
        store.save(CATEGORIES, "{oops").await.unwrap();
        let err = load_records::<serde_json::Value>(&store, CATEGORIES)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("categories"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("category_balances").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("Transactions").is_err());
    }

    #[tokio::test]
    async fn test_snapshot_restore() {
        let source = MemoryStore::default();
        source.save(TRANSACTIONS, "[]").await.unwrap();
        source.save(CATEGORIES, r#"[{"id":"1","name":"Fun"}]"#).await.unwrap();
        source.save("unrelated", "[]").await.unwrap();

        let snapshot = Snapshot::take(&source).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.names().collect::<Vec<_>>(),
            vec![CATEGORIES, TRANSACTIONS]
        );

        let target = MemoryStore::default();
        assert_eq!(snapshot.restore(&target).await.unwrap(), 2);
        let again = Snapshot::take(&target).await.unwrap();
        assert_eq!(snapshot, again);
    }
}
