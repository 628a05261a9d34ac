use crate::store::{validate_name, CollectionStore};
use crate::{utils, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::trace;

const EXTENSION: &str = "json";

/// Stores each collection as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{EXTENSION}")))
    }
}

#[async_trait::async_trait]
impl CollectionStore for JsonStore {
    async fn load(&self, name: &str) -> Result<Option<String>> {
        let path = self.path(name)?;
        trace!("load {}", path.display());
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(utils::read(&path).await?))
    }

    async fn save(&self, name: &str, body: &str) -> Result<()> {
        let path = self.path(name)?;
        trace!("save {}", path.display());
        utils::make_dir(&self.dir).await?;
        utils::write_atomic(&path, body)
            .await
            .with_context(|| format!("Unable to save the '{name}' collection"))
    }

    async fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        let mut dir = utils::read_dir(&self.dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(tmp.path().join("not-yet"));
        assert_eq!(store.load("transactions").await.unwrap(), None);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_load_list() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(tmp.path().join("data"));
        store.save("categories", "[]").await.unwrap();
        store.save("transactions", "[1]").await.unwrap();
        utils::write(tmp.path().join("data").join("notes.txt"), "x")
            .await
            .unwrap();

        assert_eq!(
            store.load("transactions").await.unwrap().as_deref(),
            Some("[1]")
        );
        assert_eq!(
            store.list().await.unwrap(),
            vec!["categories".to_string(), "transactions".to_string()]
        );
        assert!(tmp.path().join("data").join("categories.json").is_file());
    }

    #[tokio::test]
    async fn test_rejects_path_names() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(tmp.path());
        assert!(store.save("../escape", "[]").await.is_err());
    }
}
