//! Stores each collection as a `<name>.json` file through the `Drive` abstraction.

use crate::api::Drive;
use crate::store::{validate_name, CollectionStore};
use crate::Result;
use tokio::sync::Mutex;
use tracing::{debug, trace};

const SUFFIX: &str = ".json";

/// A `CollectionStore` on top of a `Drive`. Saves look the file up by name, create it when it is
/// missing, and then upload the new body. Last write wins.
pub(crate) struct DriveStore {
    drive: Mutex<Box<dyn Drive>>,
}

impl DriveStore {
    pub(crate) fn new(drive: Box<dyn Drive>) -> Self {
        Self {
            drive: Mutex::new(drive),
        }
    }
}

fn file_name(name: &str) -> Result<String> {
    validate_name(name)?;
    Ok(format!("{name}{SUFFIX}"))
}

#[async_trait::async_trait]
impl CollectionStore for DriveStore {
    async fn load(&self, name: &str) -> Result<Option<String>> {
        let file_name = file_name(name)?;
        let mut drive = self.drive.lock().await;
        match drive.find(&file_name).await? {
            None => Ok(None),
            Some(id) => {
                trace!("Downloading {file_name} ({id})");
                Ok(Some(drive.download(&id).await?))
            }
        }
    }

    async fn save(&self, name: &str, body: &str) -> Result<()> {
        let file_name = file_name(name)?;
        let mut drive = self.drive.lock().await;
        let id = match drive.find(&file_name).await? {
            Some(id) => id,
            None => {
                debug!("Creating {file_name} in Drive");
                drive.create(&file_name).await?
            }
        };
        trace!("Uploading {file_name} ({id})");
        drive.upload(&id, body).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut drive = self.drive.lock().await;
        let mut names: Vec<String> = drive
            .list()
            .await?
            .into_iter()
            .filter_map(|f| f.name.strip_suffix(SUFFIX).map(|s| s.to_string()))
            .filter(|n| validate_name(n).is_ok())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestDrive;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_creates_then_updates() {
        let tmp = TempDir::new().unwrap();
        let store = DriveStore::new(Box::new(TestDrive::new(tmp.path())));
        assert_eq!(store.load("categories").await.unwrap(), None);

        store.save("categories", "[]").await.unwrap();
        store.save("categories", "[1]").await.unwrap();

        assert_eq!(
            store.load("categories").await.unwrap().as_deref(),
            Some("[1]")
        );
        assert_eq!(store.list().await.unwrap(), vec!["categories".to_string()]);
    }
}
