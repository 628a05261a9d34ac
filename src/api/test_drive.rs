//! Implements the `Drive` trait using a local directory for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Drive. File ids are simply the file names.

use crate::api::{Drive, DriveFile};
use crate::{utils, Result};
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};

pub(crate) struct TestDrive {
    dir: PathBuf,
}

impl TestDrive {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.starts_with('.') {
            bail!("Invalid test drive file id '{id}'");
        }
        Ok(self.dir.join(id))
    }
}

#[async_trait::async_trait]
impl Drive for TestDrive {
    async fn find(&mut self, name: &str) -> Result<Option<String>> {
        let path = self.path(name)?;
        Ok(path.is_file().then(|| name.to_string()))
    }

    async fn download(&mut self, id: &str) -> Result<String> {
        let path = self.path(id)?;
        if !path.is_file() {
            bail!("File '{id}' not found");
        }
        utils::read(&path).await
    }

    async fn create(&mut self, name: &str) -> Result<String> {
        let path = self.path(name)?;
        utils::make_dir(&self.dir).await?;
        utils::write(&path, "").await?;
        Ok(name.to_string())
    }

    async fn upload(&mut self, id: &str, body: &str) -> Result<()> {
        let path = self.path(id)?;
        if !path.is_file() {
            bail!("File '{id}' not found");
        }
        utils::write(&path, body).await
    }

    async fn list(&mut self) -> Result<Vec<DriveFile>> {
        if !Path::new(&self.dir).is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        let mut dir = utils::read_dir(&self.dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            files.push(DriveFile {
                id: name.clone(),
                name,
            });
        }
        Ok(files)
    }
}
