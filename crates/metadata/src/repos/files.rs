//! Committed file repository.

use crate::error::MetadataResult;
use async_trait::async_trait;

/// Repository for completed files stored as ordered encrypted chunks.
#[async_trait]
pub trait FileRepo: Send + Sync {
    /// Commit a completed file in a single transaction.
    ///
    /// Inserts one row per chunk of `cipher_chunks` (index ascending from 0)
    /// and, when `upload_id` is given, deletes that upload's staged chunks in
    /// the same transaction. Either the whole file becomes downloadable or
    /// nothing is written, so a crash mid-completion never leaves a partial
    /// file behind.
    async fn commit_file(
        &self,
        file_id: &str,
        file_name: &str,
        upload_id: Option<&str>,
        cipher_chunks: &[Vec<u8>],
    ) -> MetadataResult<()>;

    /// Resolve the stored name for a file id, or `None` for an unknown id.
    async fn file_name(&self, file_id: &str) -> MetadataResult<Option<String>>;

    /// List a file's chunk indexes in ascending order.
    async fn chunk_indexes(&self, file_id: &str) -> MetadataResult<Vec<i64>>;

    /// Fetch one encrypted chunk of a committed file.
    async fn get_file_chunk(
        &self,
        file_id: &str,
        chunk_index: i64,
    ) -> MetadataResult<Option<Vec<u8>>>;
}
