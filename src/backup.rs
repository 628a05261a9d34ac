//! Rotating JSON backups of all collections, taken around sync operations.

use crate::store::Snapshot;
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;
use tracing::debug;

/// The remote data written locally by `sync down`.
pub const SYNC_DOWN: &str = "sync-down";

/// Local data as it was before `sync down` replaced it.
pub const SYNC_DOWN_PRE: &str = "sync-down-pre";

/// Remote data as it was before `sync up` replaced it.
pub const SYNC_UP_PRE: &str = "sync-up-pre";

const EXTENSION: &str = "json";

/// Creates and rotates backup files. Get one from `Config::backup()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
        }
    }

    /// Writes `snapshot` to `{prefix}.YYYY-MM-DD-NNN.json`, where NNN counts up within a day, then
    /// deletes the oldest files with the same prefix beyond `backup_copies`.
    ///
    /// Returns the path to the created backup file.
    pub async fn save(&self, prefix: &str, snapshot: &Snapshot) -> Result<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date).await?;
        let path = self
            .backups_dir
            .join(format!("{prefix}.{date}-{seq:03}.{EXTENSION}"));

        let json =
            serde_json::to_string_pretty(snapshot).context("Failed to serialize the backup")?;
        utils::write(&path, json).await?;
        debug!("Backed up {} collections to {}", snapshot.len(), path.display());

        self.rotate(prefix).await?;
        Ok(path)
    }

    async fn file_names(&self) -> Result<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            files.push((entry.path(), name));
        }
        Ok(files)
    }

    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Result<u32> {
        let max_seq = self
            .file_names()
            .await?
            .iter()
            .filter_map(|(_, name)| parse_sequence_number(name, prefix, date))
            .max()
            .unwrap_or(0);
        Ok(max_seq + 1)
    }

    async fn rotate(&self, prefix: &str) -> Result<()> {
        let mut files: Vec<(PathBuf, String)> = self
            .file_names()
            .await?
            .into_iter()
            .filter(|(_, name)| is_backup_file(name, prefix))
            .collect();

        // The name format sorts by date, then by sequence number.
        files.sort_by(|a, b| a.1.cmp(&b.1));

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            debug!("Removing old backup {}", path.display());
            utils::remove(&path).await?;
        }
        Ok(())
    }
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses NNN out of `{prefix}.{date}-NNN.json`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(&format!("{prefix}.{date}-"))?
        .strip_suffix(&format!(".{EXTENSION}"))?
        .parse()
        .ok()
}

/// `sync-down-pre.*` files do not count as `sync-down` backups.
fn is_backup_file(filename: &str, prefix: &str) -> bool {
    match filename
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_suffix(&format!(".{EXTENSION}")))
    {
        Some(stamp) => stamp.len() > 11 && stamp.as_bytes()[..4].iter().all(u8::is_ascii_digit),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CollectionStore, MemoryStore};
    use crate::StorageKind;
    use tempfile::TempDir;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("sync-down.2025-12-14-001.json", SYNC_DOWN, "2025-12-14"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("sync-down.2025-12-14-042.json", SYNC_DOWN, "2025-12-14"),
            Some(42)
        );
        assert_eq!(
            parse_sequence_number("sync-up-pre.2025-12-14-001.json", SYNC_DOWN, "2025-12-14"),
            None
        );
        assert_eq!(
            parse_sequence_number("sync-down.2025-12-13-001.json", SYNC_DOWN, "2025-12-14"),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file("sync-down.2025-12-14-001.json", SYNC_DOWN));
        assert!(is_backup_file("sync-up-pre.2025-12-14-001.json", SYNC_UP_PRE));
        assert!(!is_backup_file("sync-down-pre.2025-12-14-001.json", SYNC_DOWN));
        assert!(!is_backup_file("sync-down.2025-12-14-001.txt", SYNC_DOWN));
    }

    #[tokio::test]
    async fn test_save_rotates() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path(), StorageKind::Local, None, None)
            .await
            .unwrap();
        let store = MemoryStore::default();
        store.save("categories", "[]").await.unwrap();
        let snapshot = Snapshot::take(&store).await.unwrap();

        let backup = config.backup();
        let mut paths = Vec::new();
        for _ in 0..(BACKUP_COPIES_FOR_TEST + 2) {
            paths.push(backup.save(SYNC_DOWN, &snapshot).await.unwrap());
        }
        backup.save(SYNC_DOWN_PRE, &snapshot).await.unwrap();

        let kept: Vec<String> = backup
            .file_names()
            .await
            .unwrap()
            .into_iter()
            .map(|(_, n)| n)
            .filter(|n| is_backup_file(n, SYNC_DOWN))
            .collect();
        assert_eq!(kept.len(), BACKUP_COPIES_FOR_TEST);
        assert!(!paths[0].exists());
        assert!(paths.last().unwrap().exists());

        let restored: Snapshot = utils::deserialize(paths.last().unwrap()).await.unwrap();
        assert_eq!(restored, snapshot);
    }

    const BACKUP_COPIES_FOR_TEST: usize = 5;
}
