//! PostgreSQL-based metadata store implementation.

use crate::error::MetadataResult;
use crate::repos::{FileRepo, StagingRepo};
use crate::store::TransferStore;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based metadata store.
#[derive(Debug)]
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// This allows credentials to be passed separately, enabling better
    /// secret management (e.g., passwords via environment variables).
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        // Bound query runtime so a stuck sweep cannot hold a connection forever.
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl TransferStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared
        // statement, so the schema runs one statement at a time.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl StagingRepo for PostgresStore {
    async fn put_chunk(
        &self,
        upload_id: &str,
        chunk_index: i64,
        data: &[u8],
    ) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO chunks (upload_id, chunk_index, chunk_data, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (upload_id, chunk_index) DO UPDATE
            SET chunk_data = EXCLUDED.chunk_data, created_at = EXCLUDED.created_at
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
            "SELECT chunk_data FROM chunks WHERE upload_id = $1 AND chunk_index = $2",
        )
        .bind(upload_id)
        .bind(chunk_index)
        .fetch_optional(&self.pool)
        .await?;
        Ok(data)
    }

    async fn sweep_expired(&self, cutoff: OffsetDateTime) -> MetadataResult<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl FileRepo for PostgresStore {
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
                "INSERT INTO files (id, name, chunk_index, chunk_data, created_at) VALUES ($1, $2, $3, $4, $5)",
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
            sqlx::query("DELETE FROM chunks WHERE upload_id = $1")
                .bind(upload_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn file_name(&self, file_id: &str) -> MetadataResult<Option<String>> {
        let name: Option<String> =
            sqlx::query_scalar("SELECT name FROM files WHERE id = $1 LIMIT 1")
                .bind(file_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(name)
    }

    async fn chunk_indexes(&self, file_id: &str) -> MetadataResult<Vec<i64>> {
        let indexes: Vec<i64> = sqlx::query_scalar(
            "SELECT chunk_index FROM files WHERE id = $1 ORDER BY chunk_index",
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
            "SELECT chunk_data FROM files WHERE id = $1 AND chunk_index = $2",
        )
        .bind(file_id)
        .bind(chunk_index)
        .fetch_optional(&self.pool)
        .await?;
        Ok(data)
    }
}
