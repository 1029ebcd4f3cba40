//! Transfer response payloads and size presentation.

use serde::{Deserialize, Serialize};

/// Response payload for a completed upload: the capability pair.
///
/// `key` is the hex-encoded file key. This payload is the only place the
/// key ever appears; losing it makes the file permanently unrecoverable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedUpload {
    pub id: String,
    pub key: String,
}

/// Response payload for a file metadata query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    /// Human-formatted plaintext size, e.g. "0.49 KB" or "2.00 MB".
    pub file_size: String,
}

/// Format a plaintext byte count for display.
///
/// Sizes of 1 MiB and above render as megabytes, everything smaller as
/// kilobytes, both with two decimals.
pub fn human_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    }
}
