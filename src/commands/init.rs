use crate::commands::Out;
use crate::{Config, Result, StorageKind};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory, its subdirectories and an initial `config.json`.
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/fintrack`
/// - `storage` - Where collections are kept
/// - `drive_folder` - The Google Drive folder id, when storing in a specific folder
/// - `secret_file` - The downloaded OAuth 2.0 client credentials, copied into `.secrets`
///
/// # Errors
/// - Returns an error if the directory is already initialized or any file operations fail.
pub async fn init(
    home: &Path,
    storage: StorageKind,
    drive_folder: Option<&str>,
    secret_file: Option<&Path>,
) -> Result<Out<()>> {
    let config = Config::create(home, storage, drive_folder, secret_file)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(format!(
        "Created the fintrack directory at {} using {storage} storage",
        config.root().display()
    )
    .into())
}
