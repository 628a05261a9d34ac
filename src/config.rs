//! Configuration file handling for fintrack.
//!
//! The configuration file is stored at `$FINTRACK_HOME/config.json`. It records which storage
//! backend is in use, the Google Drive folder (if any), backup settings, and authentication file
//! paths.

use crate::backup::Backup;
use crate::db::Db;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_NAME: &str = "fintrack";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const SECRETS: &str = ".secrets";
const BACKUPS: &str = ".backups";
const DATA: &str = "data";
const TEST_DRIVE: &str = ".test_drive";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";
const FINTRACK_SQLITE: &str = "fintrack.sqlite";

/// Where the collections are kept.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// JSON files in `$FINTRACK_HOME/data`.
    #[default]
    Local,
    /// A SQLite file at `$FINTRACK_HOME/fintrack.sqlite`.
    Sqlite,
    /// Google Drive, with `$FINTRACK_HOME/data` as the offline cache.
    Drive,
}

serde_plain::derive_display_from_serialize!(StorageKind);
serde_plain::derive_fromstr_from_deserialize!(StorageKind);

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$FINTRACK_HOME` and from there it loads `$FINTRACK_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    secrets: PathBuf,
    data: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory, its subdirectories and an initial `config.json`.
    ///
    /// # Arguments
    /// - `dir` - The home directory, e.g. `$HOME/fintrack`
    /// - `storage` - The backend to keep collections in
    /// - `drive_folder` - The Drive folder id to use; without one the app data space is used
    /// - `client_secret` - OAuth client credentials downloaded from Google Cloud Console. They are
    ///   copied to `.secrets/client_secret.json`.
    ///
    /// # Errors
    /// - Returns an error if the directory is already initialized or any file operation fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        storage: StorageKind,
        drive_folder: Option<&str>,
        client_secret: Option<&Path>,
    ) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the fintrack home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "'{}' is already initialized, found {}",
                root.display(),
                config_path.display()
            );
        }

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;
        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;
        let data = root.join(DATA);
        utils::make_dir(&data).await?;

        if let Some(source) = client_secret {
            let destination = secrets.join(CLIENT_SECRET_JSON);
            utils::copy(source, &destination).await?;
            debug!("Copied client credentials to {}", destination.display());
        } else if storage == StorageKind::Drive {
            warn!(
                "No client secret given, place it at {} before syncing",
                secrets.join(CLIENT_SECRET_JSON).display()
            );
        }

        if storage == StorageKind::Sqlite {
            Db::init(root.join(FINTRACK_SQLITE))
                .await
                .context("Unable to create SQLite DB")?;
        }

        let config_file = ConfigFile {
            storage,
            drive_folder_id: drive_folder.map(|s| s.to_string()),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            backups,
            secrets,
            data,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load the config file
    /// - validate that the backups, secrets and data directories exist
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The fintrack home directory is missing, run 'fintrack init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!(
                "The config file is missing '{}', run 'fintrack init' first",
                config_path.display()
            )
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            backups: root.join(BACKUPS),
            secrets: root.join(SECRETS),
            data: root.join(DATA),
            root,
            config_path,
            config_file,
        };
        for (what, dir) in [
            ("backups", &config.backups),
            ("secrets", &config.secrets),
            ("data", &config.data),
        ] {
            if !dir.is_dir() {
                bail!("The {what} directory is missing '{}'", dir.display())
            }
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    /// The JSON collection directory. For Drive storage this is the offline cache.
    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    pub fn storage(&self) -> StorageKind {
        self.config_file.storage
    }

    pub fn drive_folder_id(&self) -> Option<&str> {
        self.config_file.drive_folder_id.as_deref()
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.root.join(FINTRACK_SQLITE)
    }

    /// Stands in for Google Drive when running in test mode.
    pub fn test_drive_dir(&self) -> PathBuf {
        self.root.join(TEST_DRIVE)
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative path.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        self.resolve(self.config_file.token_path())
    }

    fn resolve(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "fintrack",
///   "config_version": 1,
///   "storage": "drive",
///   "drive_folder_id": "1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT",
///   "backup_copies": 5,
///   "client_secret_path": ".secrets/client_secret.json",
///   "token_path": ".secrets/token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "fintrack"
    app_name: String,

    config_version: u8,

    #[serde(default)]
    storage: StorageKind,

    /// The Drive folder holding the collection files. The app data space when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    drive_folder_id: Option<String>,

    #[serde(default = "default_backup_copies")]
    backup_copies: u32,

    /// Relative to the home directory, or absolute. Defaults to `.secrets/client_secret.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Relative to the home directory, or absolute. Defaults to `.secrets/token.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            storage: StorageKind::default(),
            drive_folder_id: None,
            backup_copies: BACKUP_COPIES,
            client_secret_path: None,
            token_path: None,
        }
    }
}

impl ConfigFile {
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or names another application.
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .with_context(|| format!("Failed to load config file at {}", path.display()))?;
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path.as_ref(), data)
            .await
            .context("Unable to write config file")
    }

    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create_and_load() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("fintrack_home");
        let secret_source_file = dir.path().join("x.json");
        utils::write(&secret_source_file, "12345").await.unwrap();

        let config = Config::create(
            &home_dir,
            StorageKind::Drive,
            Some("folder123"),
            Some(&secret_source_file),
        )
        .await
        .unwrap();
        assert_eq!(config.storage(), StorageKind::Drive);
        assert_eq!(config.drive_folder_id(), Some("folder123"));
        assert_eq!(
            utils::read(&config.client_secret_path()).await.unwrap(),
            "12345"
        );
        // The source is copied, not moved.
        assert!(secret_source_file.is_file());
        assert!(config.backups().is_dir());
        assert!(config.data_dir().is_dir());

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.storage(), StorageKind::Drive);
        assert_eq!(loaded.backup_copies(), BACKUP_COPIES);
        assert_eq!(loaded.token_path(), loaded.root().join(SECRETS).join(TOKEN_JSON));

        assert!(Config::create(&home_dir, StorageKind::Local, None, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_config_create_sqlite() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path(), StorageKind::Sqlite, None, None)
            .await
            .unwrap();
        assert!(config.sqlite_path().is_file());
        assert_eq!(config.drive_folder_id(), None);
    }

    #[tokio::test]
    async fn test_config_load_missing() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path()).await.unwrap_err();
        assert!(format!("{err:#}").contains("fintrack init"));
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{ "app_name": "fintrack", "config_version": 1 }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(
            config.client_secret_path(),
            PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON)
        );
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{ "app_name": "wrong_app", "config_version": 1, "backup_copies": 5 }"#;
        utils::write(&config_path, json).await.unwrap();

        let err = ConfigFile::load(&config_path).await.unwrap_err();
        assert!(err.to_string().contains("Invalid app_name"));
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("client_secret_path"));
        assert!(!json.contains("drive_folder_id"));
        assert!(json.contains(r#""storage":"local""#));
    }
}
