#![allow(clippy::unwrap_used)]
// Integration tests for `AssetClient` and `StorageClient` using wiremock.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assetctl_api::types::{CompleteUploadRequest, CompletedPart};
use assetctl_api::{AssetClient, Error, IdToken, StorageClient, Unsigned};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, AssetClient) {
    let server = MockServer::start().await;
    let client =
        AssetClient::from_reqwest(&server.uri(), reqwest::Client::new(), Arc::new(Unsigned))
            .unwrap();
    (server, client)
}

fn document_record() -> serde_json::Value {
    json!({
        "document_id": "doc-1",
        "object_version": 3,
        "creation_user_id": "u-1",
        "update_user_id": "u-2",
        "creation_timestamp": "2025-01-01T00:00:00Z",
        "update_timestamp": "2025-01-02T00:00:00Z",
        "name": "Manual",
        "document_type": "pdf",
        "group_id": null,
        "last_version_number": 1
    })
}

// ── Registration ────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_returns_targets_and_record() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/assets/v1/document"))
        .and(body_json(json!({ "name": "Manual", "parts": 1 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "upload_urls": [{ "part_number": 1, "upload_url": "https://s3/p1" }],
            "upload_id": "up-1",
            "version_id": "v-1",
            "document_id": "doc-1",
            "object_version": 1,
            "creation_user_id": "u-1",
            "creation_timestamp": "2025-01-01T00:00:00Z",
            "name": "Manual"
        })))
        .mount(&server)
        .await;

    let reg = client
        .register("assets/v1/document", &json!({ "name": "Manual", "parts": 1 }))
        .await
        .unwrap();

    assert_eq!(reg.upload_id, "up-1");
    assert_eq!(reg.upload_urls.len(), 1);
    assert_eq!(reg.record.text("document_id"), Some("doc-1"));
    assert_eq!(reg.record.update_user_id, None);
}

#[tokio::test]
async fn test_token_is_sent_raw() {
    let server = MockServer::start().await;
    let token: secrecy::SecretString = "id-token-123".to_string().into();
    let client = AssetClient::from_reqwest(
        &server.uri(),
        reqwest::Client::new(),
        Arc::new(IdToken::new(&token).unwrap()),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/assets/v1/document/doc-1"))
        .and(header("authorization", "id-token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_record()))
        .expect(1)
        .mount(&server)
        .await;

    let record = client.get_record("assets/v1/document/doc-1").await.unwrap();
    assert_eq!(record.object_version, 3);
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_error_body_is_kept_verbatim() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/assets/v1/document/doc-1"))
        .respond_with(ResponseTemplate::new(409).set_body_string("object_version mismatch"))
        .mount(&server)
        .await;

    let result = client
        .patch_record("assets/v1/document/doc-1", &json!({ "object_version": 2 }))
        .await;

    match result {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 409);
            assert_eq!(body, "object_version mismatch");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_json_is_a_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/assets/v1/license/lic-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.get_record("assets/v1/license/lic-1").await;
    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body.contains("oops")),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_delete_not_found_is_classified() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/assets/v1/project/p-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client
        .delete_record("assets/v1/project/p-1")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ── Finalize ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_complete_upload_sends_query_and_parts() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/assets/v1/license/lic-1/file"))
        .and(query_param("upload_id", "up-9"))
        .and(body_json(json!({
            "parts": [
                { "part_number": 1, "etag": "aaa" },
                { "part_number": 2, "etag": "bbb" }
            ],
            "file_name": "key.lic"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let body = CompleteUploadRequest {
        parts: vec![
            CompletedPart {
                part_number: 1,
                etag: "aaa".into(),
            },
            CompletedPart {
                part_number: 2,
                etag: "bbb".into(),
            },
        ],
        file_name: "key.lic".into(),
    };

    client
        .complete_upload(
            "assets/v1/license/lic-1/file",
            &[("upload_id", "up-9".to_owned())],
            &body,
        )
        .await
        .unwrap();
}

// ── Storage ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_put_part_trims_etag_quotes() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/bucket/part1"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"abc123\""))
        .expect(1)
        .mount(&server)
        .await;

    let storage = StorageClient::from_reqwest(reqwest::Client::new());
    let tag = storage
        .put_part(
            1,
            &format!("{}/bucket/part1", server.uri()),
            Bytes::from_static(b"hello"),
        )
        .await
        .unwrap();

    assert_eq!(tag, "abc123");
}

#[tokio::test]
async fn test_put_part_without_etag_fails() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let storage = StorageClient::from_reqwest(reqwest::Client::new());
    let result = storage
        .put_part(3, &format!("{}/bucket/p3", server.uri()), Bytes::new())
        .await;

    assert!(matches!(
        result,
        Err(Error::MissingCompletionTag { part_number: 3 })
    ));
}

#[tokio::test]
async fn test_put_part_rejection_carries_status() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_string("BadDigest"))
        .mount(&server)
        .await;

    let storage = StorageClient::from_reqwest(reqwest::Client::new());
    let err = storage
        .put_part(2, &format!("{}/bucket/p2", server.uri()), Bytes::from_static(b"x"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Storage { part_number: 2, status: 400, ref body } if body == "BadDigest"
    ));
    assert!(!err.is_transient());
}
