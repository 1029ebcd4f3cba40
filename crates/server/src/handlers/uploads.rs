//! Upload handlers: single-shot, chunk staging, and completion.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use bytes::Bytes;
use satchel_core::crypto::{self, SecretKey};
use satchel_core::transfer::CompletedUpload;

fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("invalid multipart body: {err}"))
}

fn non_empty(value: Option<String>, field: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("missing '{field}' field"))),
    }
}

fn parse_chunk_index(raw: Option<&str>) -> ApiResult<i64> {
    let raw = raw.ok_or_else(|| ApiError::BadRequest("missing 'chunkIndex' field".to_string()))?;
    let index: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid chunk index: {raw}")))?;
    if index < 0 {
        return Err(ApiError::BadRequest(format!("invalid chunk index: {index}")));
    }
    Ok(index)
}

fn parse_chunk_count(raw: Option<&str>) -> ApiResult<i64> {
    let raw = raw.ok_or_else(|| ApiError::BadRequest("missing 'chunkCount' field".to_string()))?;
    let count: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid chunk count: {raw}")))?;
    if count < 1 {
        return Err(ApiError::BadRequest(format!("invalid chunk count: {count}")));
    }
    Ok(count)
}

/// POST /upload - Encrypt and store a whole file in one request.
///
/// The stored name is the filename of the `file` part. Responds with the file
/// id and the hex key; the key exists nowhere else, so losing the response
/// loses the file.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<CompletedUpload>> {
    let mut file_name: Option<String> = None;
    let mut data: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            data = Some(field.bytes().await.map_err(bad_multipart)?);
        }
    }

    let data = data.ok_or_else(|| ApiError::BadRequest("missing 'file' field".to_string()))?;
    let file_name = non_empty(file_name, "file filename")?;

    let key = SecretKey::generate();
    let id = crypto::generate_id();
    let sealed = crypto::seal(&data, &key)?;

    state
        .store
        .commit_file(&id, &file_name, None, &[sealed])
        .await?;

    tracing::info!(id = %id, size = data.len(), "Stored single-shot upload");

    Ok(Json(CompletedUpload {
        id,
        key: key.to_hex(),
    }))
}

/// POST /upload_chunk - Stage one plaintext chunk of a chunked upload.
///
/// Chunks arrive in any order under a client-chosen upload id. Retrying a
/// chunk overwrites the staged copy.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<StatusCode> {
    let mut upload_id: Option<String> = None;
    let mut chunk_index: Option<String> = None;
    let mut chunk: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        match field.name() {
            Some("uploadId") => upload_id = Some(field.text().await.map_err(bad_multipart)?),
            Some("chunkIndex") => chunk_index = Some(field.text().await.map_err(bad_multipart)?),
            Some("chunk") => chunk = Some(field.bytes().await.map_err(bad_multipart)?),
            _ => {}
        }
    }

    let upload_id = non_empty(upload_id, "uploadId")?;
    let chunk_index = parse_chunk_index(chunk_index.as_deref())?;
    let chunk = chunk.ok_or_else(|| ApiError::BadRequest("missing 'chunk' field".to_string()))?;

    state.store.put_chunk(&upload_id, chunk_index, &chunk).await?;

    Ok(StatusCode::OK)
}

/// POST /upload_complete - Encrypt staged chunks into a downloadable file.
///
/// Every chunk is fetched and encrypted before anything is written, then the
/// file rows and the staging purge land in one transaction. A missing chunk
/// fails the request without leaving a partial file behind.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_complete(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<CompletedUpload>> {
    let mut upload_id: Option<String> = None;
    let mut chunk_count: Option<String> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        match field.name() {
            Some("uploadId") => upload_id = Some(field.text().await.map_err(bad_multipart)?),
            Some("chunkCount") => chunk_count = Some(field.text().await.map_err(bad_multipart)?),
            Some("fileName") => file_name = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }

    let upload_id = non_empty(upload_id, "uploadId")?;
    let file_name = non_empty(file_name, "fileName")?;
    let chunk_count = parse_chunk_count(chunk_count.as_deref())?;

    let key = SecretKey::generate();
    let id = crypto::generate_id();

    // chunk_count comes straight from the client; never preallocate from it.
    // The loop stops at the first index with no staged row.
    let mut cipher_chunks = Vec::new();
    for index in 0..chunk_count {
        let chunk = state
            .store
            .get_chunk(&upload_id, index)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("missing chunk {index} for upload {upload_id}"))
            })?;
        cipher_chunks.push(crypto::seal(&chunk, &key)?);
    }

    state
        .store
        .commit_file(&id, &file_name, Some(&upload_id), &cipher_chunks)
        .await?;

    tracing::info!(id = %id, chunks = chunk_count, "Assembled chunked upload");

    Ok(Json(CompletedUpload {
        id,
        key: key.to_hex(),
    }))
}
