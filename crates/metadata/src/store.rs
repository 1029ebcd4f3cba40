//! Metadata store trait and implementations.

use crate::error::MetadataResult;
use crate::repos::{FileRepo, StagingRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait TransferStore: StagingRepo + FileRepo + Send + Sync + std::fmt::Debug {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
#[derive(Debug)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl TransferStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use time::OffsetDateTime;

    #[async_trait]
    impl StagingRepo for SqliteStore {
        async fn put_chunk(
            &self,
            upload_id: &str,
            chunk_index: i64,
            data: &[u8],
        ) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO chunks (upload_id, chunk_index, chunk_data, created_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(upload_id, chunk_index) DO UPDATE
                SET chunk_data = excluded.chunk_data, created_at = excluded.created_at
                "#,
            )
            .bind(upload_id)
            .bind(chunk_index)
            .bind(data)
            .bind(OffsetDateTime::now_utc())
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_chunk(
            &self,
            upload_id: &str,
            chunk_index: i64,
        ) -> MetadataResult<Option<Vec<u8>>> {
            let data: Option<Vec<u8>> = sqlx::query_scalar(
                "SELECT chunk_data FROM chunks WHERE upload_id = ? AND chunk_index = ?",
            )
            .bind(upload_id)
            .bind(chunk_index)
            .fetch_optional(&self.pool)
            .await?;
            Ok(data)
        }

        async fn sweep_expired(&self, cutoff: OffsetDateTime) -> MetadataResult<u64> {
            let result = sqlx::query("DELETE FROM chunks WHERE created_at < ?")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl FileRepo for SqliteStore {
        async fn commit_file(
            &self,
            file_id: &str,
            file_name: &str,
            upload_id: Option<&str>,
            cipher_chunks: &[Vec<u8>],
        ) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;
            let now = OffsetDateTime::now_utc();

            for (index, data) in cipher_chunks.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO files (id, name, chunk_index, chunk_data, created_at) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(file_id)
                .bind(file_name)
                .bind(index as i64)
                .bind(data.as_slice())
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            // The staged plaintext is consumed by the same commit that makes
            // the encrypted file visible.
            if let Some(upload_id) = upload_id {
                sqlx::query("DELETE FROM chunks WHERE upload_id = ?")
                    .bind(upload_id)
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;
            Ok(())
        }

        async fn file_name(&self, file_id: &str) -> MetadataResult<Option<String>> {
            let name: Option<String> =
                sqlx::query_scalar("SELECT name FROM files WHERE id = ? LIMIT 1")
                    .bind(file_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(name)
        }

        async fn chunk_indexes(&self, file_id: &str) -> MetadataResult<Vec<i64>> {
            let indexes: Vec<i64> = sqlx::query_scalar(
                "SELECT chunk_index FROM files WHERE id = ? ORDER BY chunk_index",
            )
            .bind(file_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(indexes)
        }

        async fn get_file_chunk(
            &self,
            file_id: &str,
            chunk_index: i64,
        ) -> MetadataResult<Option<Vec<u8>>> {
            let data: Option<Vec<u8>> = sqlx::query_scalar(
                "SELECT chunk_data FROM files WHERE id = ? AND chunk_index = ?",
            )
            .bind(file_id)
            .bind(chunk_index)
            .fetch_optional(&self.pool)
            .await?;
            Ok(data)
        }
    }
}

impl std::convert::From<std::io::Error> for crate::MetadataError {
    fn from(e: std::io::Error) -> Self {
        crate::MetadataError::Config(e.to_string())
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- Plaintext chunks staged between /upload_chunk and /upload_complete
CREATE TABLE IF NOT EXISTS chunks (
    upload_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    chunk_data BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (upload_id, chunk_index)
);
CREATE INDEX IF NOT EXISTS idx_chunks_created_at ON chunks(created_at);

-- Encrypted chunks of completed files
CREATE TABLE IF NOT EXISTS files (
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    chunk_data BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (id, chunk_index)
);
"#;
