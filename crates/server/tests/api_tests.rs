//! Integration tests for HTTP API endpoints.

mod common;

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, Request, StatusCode};
use common::TestServer;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "satchel-test-boundary";

/// One part of a multipart form body.
enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        data: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Helper to POST a multipart form and parse the JSON response.
async fn multipart_request(
    router: &axum::Router,
    uri: &str,
    parts: &[Part<'_>],
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Helper to GET a URI and return status, headers, and raw body bytes.
async fn get_raw(router: &axum::Router, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();

    (status, headers, body)
}

/// Helper to GET a URI and parse the JSON response.
async fn get_json(router: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get_raw(router, uri).await;

    let json: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Upload a file in one shot and return its (id, key) pair.
async fn upload_file(server: &TestServer, file_name: &str, data: &[u8]) -> (String, String) {
    let (status, body) = multipart_request(
        &server.router,
        "/upload",
        &[Part::File {
            name: "file",
            file_name,
            data,
        }],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().expect("upload response id").to_string();
    let key = body["key"]
        .as_str()
        .expect("upload response key")
        .to_string();
    (id, key)
}

/// Stage one chunk under `upload_id` and assert the empty 200 response.
async fn stage_chunk(server: &TestServer, upload_id: &str, index: i64, data: &[u8]) {
    let index = index.to_string();
    let (status, body) = multipart_request(
        &server.router,
        "/upload_chunk",
        &[
            Part::Text("uploadId", upload_id),
            Part::Text("chunkIndex", &index),
            Part::File {
                name: "chunk",
                file_name: "blob",
                data,
            },
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

/// Complete a chunked upload and return the raw (status, body) pair.
async fn complete_upload(
    server: &TestServer,
    upload_id: &str,
    chunk_count: &str,
    file_name: &str,
) -> (StatusCode, Value) {
    multipart_request(
        &server.router,
        "/upload_complete",
        &[
            Part::Text("uploadId", upload_id),
            Part::Text("chunkCount", chunk_count),
            Part::Text("fileName", file_name),
        ],
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let (status, body) = get_json(&server.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("status").and_then(|v| v.as_str()), Some("ok"));
    assert!(body.get("version").is_some());
}

#[tokio::test]
async fn test_single_shot_upload_roundtrip() {
    let server = TestServer::new().await;
    let data = b"hello from a single-shot upload";

    let (id, key) = upload_file(&server, "hello.txt", data).await;

    // The id is 16 random bytes hex-encoded, the key 32.
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));

    let (status, headers, body) =
        get_raw(&server.router, &format!("/download/{id}?key={key}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, data.to_vec());
    assert_eq!(
        headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/octet-stream")
    );
    assert_eq!(
        headers.get(CONTENT_DISPOSITION).and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\"hello.txt\"")
    );
}

#[tokio::test]
async fn test_upload_generates_fresh_capability_per_file() {
    let server = TestServer::new().await;

    let (id_a, key_a) = upload_file(&server, "a.txt", b"same bytes").await;
    let (id_b, key_b) = upload_file(&server, "b.txt", b"same bytes").await;

    assert_ne!(id_a, id_b);
    assert_ne!(key_a, key_b);
}

#[tokio::test]
async fn test_upload_rejects_missing_file_field() {
    let server = TestServer::new().await;

    let (status, body) =
        multipart_request(&server.router, "/upload", &[Part::Text("name", "x.txt")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_upload_rejects_file_part_without_filename() {
    let server = TestServer::new().await;

    // A plain text part named "file" carries no filename attribute.
    let (status, body) = multipart_request(
        &server.router,
        "/upload",
        &[Part::Text("file", "payload without a filename")],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_empty_file_roundtrip() {
    let server = TestServer::new().await;

    let (id, key) = upload_file(&server, "empty.txt", b"").await;

    let (status, _, body) = get_raw(&server.router, &format!("/download/{id}?key={key}")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_chunked_upload_out_of_order() {
    let server = TestServer::new().await;
    let upload_id = "out-of-order-upload";

    // Arrival order must not matter; only the index does.
    stage_chunk(&server, upload_id, 2, b"cc").await;
    stage_chunk(&server, upload_id, 0, b"aa").await;
    stage_chunk(&server, upload_id, 1, b"bb").await;

    let (status, body) = complete_upload(&server, upload_id, "3", "ordered.bin").await;
    assert_eq!(status, StatusCode::OK);

    let id = body["id"].as_str().unwrap();
    let key = body["key"].as_str().unwrap();

    let (status, _, data) = get_raw(&server.router, &format!("/download/{id}?key={key}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data, b"aabbcc".to_vec());

    // The size is the plaintext total across chunks.
    let (status, info) = get_json(&server.router, &format!("/get/{id}?key={key}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["fileName"], "ordered.bin");
    assert_eq!(info["fileSize"], "0.01 KB");
}

#[tokio::test]
async fn test_chunk_retry_overwrites_staged_data() {
    let server = TestServer::new().await;
    let upload_id = "retry-upload";

    stage_chunk(&server, upload_id, 0, b"old").await;
    stage_chunk(&server, upload_id, 0, b"new").await;
    stage_chunk(&server, upload_id, 1, b"tail").await;

    let (status, body) = complete_upload(&server, upload_id, "2", "retried.bin").await;
    assert_eq!(status, StatusCode::OK);

    let id = body["id"].as_str().unwrap();
    let key = body["key"].as_str().unwrap();

    let (status, _, data) = get_raw(&server.router, &format!("/download/{id}?key={key}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data, b"newtail".to_vec());
}

#[tokio::test]
async fn test_complete_with_missing_chunk_leaves_staging_intact() {
    let server = TestServer::new().await;
    let upload_id = "gappy-upload";

    stage_chunk(&server, upload_id, 0, b"solo").await;

    // Claiming two chunks when only one is staged fails the completion.
    let (status, body) = complete_upload(&server, upload_id, "2", "gappy.bin").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    // The staged chunk survived the failed attempt, so a corrected count
    // still succeeds.
    let (status, body) = complete_upload(&server, upload_id, "1", "gappy.bin").await;
    assert_eq!(status, StatusCode::OK);

    let id = body["id"].as_str().unwrap();
    let key = body["key"].as_str().unwrap();

    let (status, _, data) = get_raw(&server.router, &format!("/download/{id}?key={key}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data, b"solo".to_vec());
}

#[tokio::test]
async fn test_complete_with_huge_chunk_count_is_not_found() {
    let server = TestServer::new().await;
    let upload_id = "bragging-upload";

    stage_chunk(&server, upload_id, 0, b"small").await;

    // A count near i64::MAX parses fine but must fail at the first gap,
    // not reserve memory for the claimed total.
    let (status, body) =
        complete_upload(&server, upload_id, "2305843009213693952", "huge.bin").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    // The staged chunk is still usable afterwards.
    let (status, body) = complete_upload(&server, upload_id, "1", "huge.bin").await;
    assert_eq!(status, StatusCode::OK);

    let id = body["id"].as_str().unwrap();
    let key = body["key"].as_str().unwrap();

    let (status, _, data) = get_raw(&server.router, &format!("/download/{id}?key={key}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data, b"small".to_vec());
}

#[tokio::test]
async fn test_upload_chunk_rejects_bad_fields() {
    let server = TestServer::new().await;
    let blob = Part::File {
        name: "chunk",
        file_name: "blob",
        data: b"x",
    };

    // Missing uploadId.
    let (status, body) = multipart_request(
        &server.router,
        "/upload_chunk",
        &[Part::Text("chunkIndex", "0"), blob],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    // Negative index.
    let (status, _) = multipart_request(
        &server.router,
        "/upload_chunk",
        &[
            Part::Text("uploadId", "u"),
            Part::Text("chunkIndex", "-1"),
            Part::File {
                name: "chunk",
                file_name: "blob",
                data: b"x",
            },
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing chunk payload.
    let (status, _) = multipart_request(
        &server.router,
        "/upload_chunk",
        &[Part::Text("uploadId", "u"), Part::Text("chunkIndex", "0")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_complete_rejects_bad_fields() {
    let server = TestServer::new().await;

    // A chunk count below one can never describe an upload.
    let (status, body) = complete_upload(&server, "u", "0", "f.bin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    // Blank file name.
    let (status, _) = complete_upload(&server, "u", "1", "  ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing uploadId.
    let (status, _) = multipart_request(
        &server.router,
        "/upload_complete",
        &[Part::Text("chunkCount", "1"), Part::Text("fileName", "f")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_wrong_key_is_decryption_error() {
    let server = TestServer::new().await;

    let (id, _key) = upload_file(&server, "secret.txt", b"confidential bytes").await;

    let wrong_key = "11".repeat(32);
    let (status, body) = get_json(&server.router, &format!("/download/{id}?key={wrong_key}")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "decryption_failed");
    assert_eq!(body["message"], "error decrypting file");
}

#[tokio::test]
async fn test_download_malformed_key_is_bad_request() {
    let server = TestServer::new().await;

    let (id, _key) = upload_file(&server, "secret.txt", b"confidential bytes").await;

    let (status, body) = get_json(&server.router, &format!("/download/{id}?key=zzzz")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_download_wrong_length_key_is_decryption_error() {
    let server = TestServer::new().await;

    let (id, _key) = upload_file(&server, "secret.txt", b"confidential bytes").await;

    // Valid hex, wrong length. Indistinguishable from a wrong key.
    let (status, body) = get_json(&server.router, &format!("/download/{id}?key=00112233")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "decryption_failed");
}

#[tokio::test]
async fn test_download_missing_key_param_is_decryption_error() {
    let server = TestServer::new().await;

    let (id, _key) = upload_file(&server, "secret.txt", b"confidential bytes").await;

    let (status, body) = get_json(&server.router, &format!("/download/{id}")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "decryption_failed");
}

#[tokio::test]
async fn test_download_unknown_id_is_not_found() {
    let server = TestServer::new().await;

    let key = "22".repeat(32);
    let (status, body) = get_json(
        &server.router,
        &format!("/download/00000000000000000000000000000000?key={key}"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_file_info_reports_plaintext_size() {
    let server = TestServer::new().await;

    let small = vec![7u8; 500];
    let (id, key) = upload_file(&server, "small.bin", &small).await;

    let (status, body) = get_json(&server.router, &format!("/get/{id}?key={key}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fileName"], "small.bin");
    // 500 plaintext bytes, not 528 sealed ones.
    assert_eq!(body["fileSize"], "0.49 KB");
}

#[tokio::test]
async fn test_file_info_megabyte_formatting() {
    let server = TestServer::new().await;

    let big = vec![0u8; 2 * 1024 * 1024];
    let (id, key) = upload_file(&server, "big.bin", &big).await;

    let (status, body) = get_json(&server.router, &format!("/get/{id}?key={key}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fileSize"], "2.00 MB");
}

#[tokio::test]
async fn test_file_info_wrong_key_is_decryption_error() {
    let server = TestServer::new().await;

    let (id, _key) = upload_file(&server, "small.bin", b"some bytes").await;

    let wrong_key = "33".repeat(32);
    let (status, body) = get_json(&server.router, &format!("/get/{id}?key={wrong_key}")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "decryption_failed");
    assert_eq!(body["message"], "error decrypting file");
}

#[tokio::test]
async fn test_file_info_unknown_id_is_not_found() {
    let server = TestServer::new().await;

    let key = "44".repeat(32);
    let (status, body) = get_json(
        &server.router,
        &format!("/get/ffffffffffffffffffffffffffffffff?key={key}"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}
