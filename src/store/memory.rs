//! An in-memory `CollectionStore`, mainly for tests. It can be told to fail every save so that
//! persistence-failure handling can be exercised.

use crate::store::{validate_name, CollectionStore};
use crate::Result;
use anyhow::{anyhow, bail};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, String>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// When `fail` is true, every subsequent `save` returns an error and stores nothing.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CollectionStore for MemoryStore {
    async fn load(&self, name: &str) -> Result<Option<String>> {
        let data = self
            .data
            .lock()
            .map_err(|_| anyhow!("MemoryStore lock poisoned"))?;
        Ok(data.get(name).cloned())
    }

    async fn save(&self, name: &str, body: &str) -> Result<()> {
        validate_name(name)?;
        if self.fail_saves.load(Ordering::SeqCst) {
            bail!("Simulated failure saving '{name}'");
        }
        let mut data = self
            .data
            .lock()
            .map_err(|_| anyhow!("MemoryStore lock poisoned"))?;
        data.insert(name.to_string(), body.to_string());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let data = self
            .data
            .lock()
            .map_err(|_| anyhow!("MemoryStore lock poisoned"))?;
        Ok(data.keys().cloned().collect())
    }
}
