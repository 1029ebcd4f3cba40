//! Staged chunk repository.

use crate::error::MetadataResult;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for chunks staged during a chunked upload.
///
/// Staged chunks are plaintext and transient: they live only between
/// `/upload_chunk` and `/upload_complete`, and the sweep task reclaims
/// whatever completion never consumed.
#[async_trait]
pub trait StagingRepo: Send + Sync {
    /// Stage one chunk of an in-progress upload.
    ///
    /// Upserts on `(upload_id, chunk_index)` so a client retry of the same
    /// chunk overwrites the earlier copy and refreshes its retention clock.
    async fn put_chunk(
        &self,
        upload_id: &str,
        chunk_index: i64,
        data: &[u8],
    ) -> MetadataResult<()>;

    /// Fetch one staged chunk, or `None` if it was never staged (or already
    /// swept).
    async fn get_chunk(
        &self,
        upload_id: &str,
        chunk_index: i64,
    ) -> MetadataResult<Option<Vec<u8>>>;

    /// Delete staged chunks older than `cutoff`. Returns the number of rows
    /// removed.
    async fn sweep_expired(&self, cutoff: OffsetDateTime) -> MetadataResult<u64>;
}
