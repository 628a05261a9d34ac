//! This module is responsible for reading, writing and managing the SQLite database. Each
//! collection is one row of the `collections` table.

mod migrations;

use crate::store::{validate_name, CollectionStore};
use crate::Result;
use anyhow::{ensure, Context};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Creates a new SQLite file at `path`, which must not exist yet
    /// - Initializes the schema to the current version
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure!(
            !path.exists(),
            "A database already exists at {}",
            path.display()
        );
        let db = Self::connect(path, true).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// - Opens the SQLite file at `path`, which must exist
    /// - Brings the schema up to date if it is behind
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure!(
            path.is_file(),
            "No database found at {}, run 'fintrack init --storage sqlite' first",
            path.display()
        );
        let db = Self::connect(path, false).await?;
        db.migrate().await?;
        Ok(db)
    }

    async fn connect(path: &Path, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .context("Failed to parse SQLite connection string")?
            .create_if_missing(create);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open the database at {}", path.display()))?;
        Ok(Self { pool })
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await
            .context("Failed to create schema_version table")?;
        let current = self.schema_version().await?;
        ensure!(
            current <= migrations::CURRENT_VERSION,
            "The database schema is at version {current}, which is newer than this program \
            supports ({})",
            migrations::CURRENT_VERSION
        );
        migrations::run(&self.pool, current, migrations::CURRENT_VERSION).await
    }

    async fn schema_version(&self) -> Result<i32> {
        let row: (i32,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(&self.pool)
            .await
            .context("Failed to query schema version")?;
        Ok(row.0)
    }
}

#[async_trait::async_trait]
impl CollectionStore for Db {
    async fn load(&self, name: &str) -> Result<Option<String>> {
        validate_name(name)?;
        let row: Option<(String,)> = sqlx::query_as("SELECT body FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read the '{name}' collection"))?;
        Ok(row.map(|r| r.0))
    }

    async fn save(&self, name: &str, body: &str) -> Result<()> {
        validate_name(name)?;
        sqlx::query(
            "INSERT INTO collections (name, body, updated_at) VALUES (?, ?, ?) \
            ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(name)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write the '{name}' collection"))?;
        debug!("Saved '{name}' to the database");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM collections ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list collections")?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
