//! `fintrack sync` copies every collection between this machine and Google Drive. The side being
//! replaced is backed up first. There is no merging, the copy being written wins.

use crate::backup::{SYNC_DOWN, SYNC_DOWN_PRE, SYNC_UP_PRE};
use crate::commands::{plural, Out};
use crate::store::{self, Snapshot};
use crate::{Config, Mode, Result};
use anyhow::bail;
use tracing::debug;

/// Replaces the local collections with the ones in Drive.
pub async fn sync_down(config: &Config, mode: Mode) -> Result<Out<()>> {
    let remote = store::open_remote(config, mode).await?;
    let local = store::open_local(config).await?;

    let incoming = Snapshot::take(&remote).await?;
    if incoming.is_empty() {
        bail!("There is nothing in Google Drive yet, run 'fintrack sync up' first");
    }

    let existing = Snapshot::take(local.as_ref()).await?;
    if !existing.is_empty() {
        let path = config.backup().save(SYNC_DOWN_PRE, &existing).await?;
        debug!("Saved the local data to {}", path.display());
    }

    debug!("Downloading {}", incoming.names().collect::<Vec<_>>().join(", "));
    let count = incoming.restore(local.as_ref()).await?;
    let path = config.backup().save(SYNC_DOWN, &incoming).await?;
    debug!("Saved the downloaded data to {}", path.display());

    Ok(format!(
        "Downloaded {} from Google Drive",
        plural(count, "collection", "collections")
    )
    .into())
}

/// Replaces the collections in Drive with the local ones.
pub async fn sync_up(config: &Config, mode: Mode) -> Result<Out<()>> {
    let local = store::open_local(config).await?;
    let remote = store::open_remote(config, mode).await?;

    let outgoing = Snapshot::take(local.as_ref()).await?;
    if outgoing.is_empty() {
        bail!("There is no local data to upload");
    }

    let existing = Snapshot::take(&remote).await?;
    if !existing.is_empty() {
        let path = config.backup().save(SYNC_UP_PRE, &existing).await?;
        debug!("Saved the Google Drive data to {}", path.display());
    }

    debug!("Uploading {}", outgoing.names().collect::<Vec<_>>().join(", "));
    let count = outgoing.restore(&remote).await?;
    Ok(format!(
        "Uploaded {} to Google Drive",
        plural(count, "collection", "collections")
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::CategoryAddArgs;
    use crate::commands::{category_add, category_list};
    use crate::model::Amount;
    use crate::test::TestEnv;
    use crate::utils;

    #[tokio::test]
    async fn test_sync_round_trip() {
        let env = TestEnv::drive().await;
        let config = env.config();

        assert!(sync_up(&config, Mode::Test).await.is_err());
        assert!(sync_down(&config, Mode::Test).await.is_err());

        // Drive storage writes through the cache to the test drive.
        category_add(
            &config,
            Mode::Test,
            &CategoryAddArgs::new("Rent", Amount::default(), None, None),
        )
        .await
        .unwrap();
        assert!(config.test_drive_dir().join("categories.json").is_file());

        // Losing the local copy and syncing down brings it back.
        utils::remove(config.data_dir().join("categories.json"))
            .await
            .unwrap();
        let out = sync_down(&config, Mode::Test).await.unwrap();
        assert!(out.message().contains("1 collection"));
        assert!(config.data_dir().join("categories.json").is_file());

        let out = sync_up(&config, Mode::Test).await.unwrap();
        assert!(out.message().starts_with("Uploaded"));

        let list = category_list(&config, Mode::Test).await.unwrap();
        assert_eq!(list.structure().unwrap().len(), 1);

        let mut backups = utils::read_dir(config.backups()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = backups.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert!(names.iter().any(|n| n.starts_with("sync-down.")));
        assert!(names.iter().any(|n| n.starts_with("sync-up-pre.")));
    }
}
