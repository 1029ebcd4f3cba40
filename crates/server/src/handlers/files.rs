//! Download and file metadata handlers (read path).

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use satchel_core::crypto::{self, SecretKey};
use satchel_core::transfer::{FileInfo, human_size};
use serde::Deserialize;

/// Query parameters carrying the capability key.
///
/// `key` defaults to empty so a missing parameter fails inside the crypto
/// engine exactly like a wrong key, not as a separate error shape.
#[derive(Debug, Deserialize)]
pub struct KeyParams {
    #[serde(default)]
    key: String,
}

/// GET /download/{id} - Decrypt and stream a stored file.
#[tracing::instrument(skip(state, params))]
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<KeyParams>,
) -> ApiResult<Response> {
    let key = SecretKey::from_hex(&params.key)?;

    let file_name = state
        .store
        .file_name(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("file not found: {id}")))?;

    // Decrypt the first chunk before the status line goes out, so a wrong key
    // becomes an error response instead of a truncated 200.
    let mut indexes = state.store.chunk_indexes(&id).await?.into_iter();
    let first_plain = match indexes.next() {
        Some(index) => {
            let sealed = state
                .store
                .get_file_chunk(&id, index)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("missing chunk {index} for file {id}"))
                })?;
            crypto::open(&sealed, &key)?
        }
        None => Vec::new(),
    };

    let store = state.store.clone();
    let stream_id = id.clone();
    let tail = futures::stream::iter(indexes).then(move |index| {
        let store = store.clone();
        let key = key.clone();
        let id = stream_id.clone();
        async move {
            let sealed = store
                .get_file_chunk(&id, index)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("missing chunk {index} for file {id}"))
                })?;
            crypto::open(&sealed, &key).map_err(|e| {
                tracing::error!(id = %id, chunk_index = index, "Decryption failed mid-stream");
                ApiError::from(e)
            })
        }
    });

    let stream = futures::stream::iter([Ok::<_, ApiError>(first_plain)])
        .chain(tail)
        .map(|result| result.map_err(|e| std::io::Error::other(e.to_string())));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// GET /get/{id} - File name and decrypted size.
#[tracing::instrument(skip(state, params))]
pub async fn file_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<KeyParams>,
) -> ApiResult<Json<FileInfo>> {
    let key = SecretKey::from_hex(&params.key)?;

    let file_name = state
        .store
        .file_name(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("file not found: {id}")))?;

    // The size reported is the decrypted total, so the AEAD overhead never
    // shows up in it.
    let mut total: u64 = 0;
    for index in state.store.chunk_indexes(&id).await? {
        let sealed = state
            .store
            .get_file_chunk(&id, index)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("missing chunk {index} for file {id}")))?;
        total += crypto::open(&sealed, &key)?.len() as u64;
    }

    Ok(Json(FileInfo {
        file_name,
        file_size: human_size(total),
    }))
}
