//! Access to Google Drive, where collections are kept as JSON files.
//!
//! The `Drive` trait is the seam: `GoogleDrive` talks to the Drive v3 REST API, and `TestDrive`
//! emulates it in a local directory so the whole program can run without Google.

mod files;
mod google_drive;
mod oauth;
mod test_drive;

pub(crate) use google_drive::GoogleDrive;
pub(crate) use oauth::TokenProvider;
pub(crate) use test_drive::TestDrive;

use crate::{Config, Result};
use serde::Deserialize;

/// OAuth scopes required for reading and writing the application's own Drive files.
const OAUTH_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/drive.appdata",
];

/// When this environment variable is set and non-empty, `Mode::Test` is used.
pub const TEST_MODE_ENV: &str = "FINTRACK_IN_TEST_MODE";

/// Selects the `Drive` implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Talk to Google Drive.
    #[default]
    Google,
    /// Use a directory inside the fintrack home in place of Google Drive.
    Test,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// A file in the Drive folder (or app data space) that holds the collections.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct DriveFile {
    pub(crate) id: String,
    pub(crate) name: String,
}

/// The handful of Drive operations the collection store needs.
#[async_trait::async_trait]
pub(crate) trait Drive: Send {
    /// Returns the id of the file named `name`, if there is one.
    async fn find(&mut self, name: &str) -> Result<Option<String>>;

    /// Downloads the contents of the file.
    async fn download(&mut self, id: &str) -> Result<String>;

    /// Creates an empty file named `name` and returns its id.
    async fn create(&mut self, name: &str) -> Result<String>;

    /// Replaces the contents of the file.
    async fn upload(&mut self, id: &str, body: &str) -> Result<()>;

    /// Lists every file.
    async fn list(&mut self) -> Result<Vec<DriveFile>>;
}

/// Creates the `Drive` for `mode`.
pub(crate) async fn drive(config: &Config, mode: Mode) -> Result<Box<dyn Drive>> {
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Ok(Box::new(GoogleDrive::new(
                config.drive_folder_id().map(|s| s.to_string()),
                token_provider,
            )))
        }
        Mode::Test => Ok(Box::new(TestDrive::new(config.test_drive_dir()))),
    }
}
