//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::{Config, StorageKind};
use tempfile::TempDir;

const CLIENT_SECRET: &str = r#"{
    "installed": {
        "client_id": "test-client-id",
        "client_secret": "test-secret",
        "redirect_uris": ["http://localhost"],
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token"
    }
}"#;

/// A fintrack home directory in a temporary location.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// A home that keeps collections as JSON files.
    pub async fn new() -> Self {
        Self::create(StorageKind::Local, false).await
    }

    /// A home that keeps collections in SQLite.
    pub async fn sqlite() -> Self {
        Self::create(StorageKind::Sqlite, false).await
    }

    /// A home that keeps collections in Drive, with client credentials but no token yet. Use it
    /// with `Mode::Test` so that the test drive directory stands in for Google.
    pub async fn drive() -> Self {
        Self::create(StorageKind::Drive, true).await
    }

    async fn create(storage: StorageKind, with_secret: bool) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("fintrack");
        let secret_path = temp_dir.path().join("client_secret.json");
        std::fs::write(&secret_path, CLIENT_SECRET).unwrap();

        let secret = with_secret.then_some(secret_path.as_path());
        let config = Config::create(&root, storage, None, secret).await.unwrap();

        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }
}
