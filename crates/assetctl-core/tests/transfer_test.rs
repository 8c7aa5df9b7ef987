#![allow(clippy::unwrap_used)]
// End-to-end transfer and reconcile scenarios against a wiremock server.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use wiremock::matchers::{body_json, body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assetctl_api::{AssetClient, StorageClient, Unsigned};
use assetctl_core::resource::{AuditInfo, TrackedFile};
use assetctl_core::{
    AssetService, CoreError, DesiredConfig, Field, FieldValue, Phase, PreparedTransfer,
    ResourceKind, ResourceSnapshot, RetryPolicy, SessionState, TransferSession,
    UploadCoordinator, UploadOptions,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn options(chunk_size: u64) -> UploadOptions {
    UploadOptions {
        chunk_size,
        ..UploadOptions::default()
    }
}

fn clients(server: &MockServer) -> (Arc<AssetClient>, StorageClient) {
    let client =
        AssetClient::from_reqwest(&server.uri(), reqwest::Client::new(), Arc::new(Unsigned))
            .unwrap();
    (
        Arc::new(client),
        StorageClient::from_reqwest(reqwest::Client::new()),
    )
}

fn service(server: &MockServer, options: UploadOptions) -> AssetService {
    let (client, storage) = clients(server);
    AssetService::from_parts(client, storage, options)
}

fn source_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

fn targets(server: &MockServer, count: u32) -> Value {
    (1..=count)
        .map(|n| {
            json!({
                "part_number": n,
                "upload_url": format!("{}/s3/part{n}", server.uri())
            })
        })
        .collect()
}

fn document_registration(upload_urls: Value) -> Value {
    json!({
        "upload_urls": upload_urls,
        "upload_id": "up-1",
        "version_id": "v-1",
        "document_id": "doc-1",
        "object_version": 1,
        "creation_user_id": "u-1",
        "update_user_id": null,
        "creation_timestamp": "2025-01-01T00:00:00Z",
        "update_timestamp": null,
        "name": "Manual",
        "document_type": "pdf",
        "group_id": null,
        "last_version_number": 1
    })
}

fn text(s: &str) -> Field<FieldValue> {
    Field::Set(FieldValue::Text(s.to_owned()))
}

fn document(file: &NamedTempFile) -> DesiredConfig {
    DesiredConfig::new(ResourceKind::Document)
        .with("name", text("Manual"))
        .with("document_type", text("pdf"))
        .with("commit_message", text("first cut"))
        .with_source(file.path())
}

async fn mount_parts(server: &MockServer, count: u32) {
    for n in 1..=count {
        Mock::given(method("PUT"))
            .and(path(format!("/s3/part{n}")))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", format!("\"etag-{n}\"")))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn tracked_document(file: &NamedTempFile) -> ResourceSnapshot {
    ResourceSnapshot {
        kind: ResourceKind::Document,
        id: "doc-1".into(),
        object_version: 3,
        version_id: Some("v-1".into()),
        fields: [
            ("name".to_owned(), FieldValue::Text("Manual".into())),
            ("document_type".to_owned(), FieldValue::Text("pdf".into())),
            ("group_id".to_owned(), FieldValue::Text("g-1".into())),
        ]
        .into_iter()
        .collect(),
        audit: AuditInfo::default(),
        file: Some(TrackedFile {
            path: file.path().to_path_buf(),
            name: "manual.pdf".into(),
            size: 10,
        }),
    }
}

// ── Create ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_three_part_upload_finalizes_in_order() {
    let server = MockServer::start().await;
    let file = source_file(b"abcdefghij");

    Mock::given(method("POST"))
        .and(path("/assets/v1/document"))
        .and(body_partial_json(json!({
            "name": "Manual",
            "document_type": "pdf",
            "commit_message": "first cut",
            "parts": 3,
            "file_size": 10,
            "part_md5s": [
                "4vxxTEcn7pOV8yTNLn8zHw==",
                assetctl_core::chunk::checksum(b"efgh").as_str(),
                assetctl_core::chunk::checksum(b"ij").as_str()
            ]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(document_registration(targets(&server, 3))))
        .expect(1)
        .mount(&server)
        .await;
    mount_parts(&server, 3).await;

    let file_name = file.path().file_name().unwrap().to_str().unwrap().to_owned();
    Mock::given(method("POST"))
        .and(path("/assets/v1/document/doc-1/version/v-1/complete_upload/up-1"))
        .and(body_json(json!({
            "parts": [
                { "part_number": 1, "etag": "etag-1" },
                { "part_number": 2, "etag": "etag-2" },
                { "part_number": 3, "etag": "etag-3" }
            ],
            "file_name": file_name
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = service(&server, options(4))
        .create(&document(&file))
        .await
        .unwrap();

    assert_eq!(snapshot.id, "doc-1");
    assert_eq!(snapshot.object_version, 1);
    assert_eq!(snapshot.version_id.as_deref(), Some("v-1"));
    assert_eq!(
        snapshot.field("commit_message"),
        Some(&FieldValue::Text("first cut".into()))
    );
    assert_eq!(snapshot.file.as_ref().unwrap().size, 10);
}

#[tokio::test]
async fn test_target_count_mismatch_uploads_nothing() {
    let server = MockServer::start().await;
    let file = source_file(b"abcdefghij");

    Mock::given(method("POST"))
        .and(path("/assets/v1/document"))
        .respond_with(ResponseTemplate::new(201).set_body_json(document_registration(targets(&server, 2))))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"x\""))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex("complete_upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = service(&server, options(4))
        .create(&document(&file))
        .await
        .unwrap_err();

    match &err {
        CoreError::Abandoned {
            resource_id,
            upload_id,
            ..
        } => {
            assert_eq!(resource_id, "doc-1");
            assert_eq!(upload_id, "up-1");
        }
        other => panic!("expected Abandoned, got: {other:?}"),
    }
    assert!(
        matches!(
            err.root_cause(),
            CoreError::ProtocolMismatch {
                expected: 3,
                actual: 2
            }
        ),
        "expected ProtocolMismatch underneath, got: {err:?}"
    );
}

#[tokio::test]
async fn test_part_transport_failure_fails_session_without_finalize() {
    let server = MockServer::start().await;
    let file = source_file(b"abcdefghij");

    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_addr = closed.local_addr().unwrap();
    drop(closed);

    let upload_urls = json!([
        { "part_number": 1, "upload_url": format!("{}/s3/part1", server.uri()) },
        { "part_number": 2, "upload_url": format!("http://{dead_addr}/s3/part2") }
    ]);
    Mock::given(method("POST"))
        .and(path("/assets/v1/document"))
        .respond_with(ResponseTemplate::new(201).set_body_json(document_registration(upload_urls)))
        .mount(&server)
        .await;
    mount_parts(&server, 1).await;
    Mock::given(method("POST"))
        .and(path_regex("complete_upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, storage) = clients(&server);
    let coordinator = UploadCoordinator::new(
        client,
        storage,
        UploadOptions {
            concurrency: 1,
            ..options(5)
        },
    );
    let desired = document(&file);
    let transfer = PreparedTransfer::from_file(file.path(), 5).await.unwrap();
    let mut session =
        TransferSession::new(transfer.plan(), transfer.checksums().to_vec()).unwrap();

    let err = coordinator
        .execute(
            &mut session,
            ResourceKind::Document.descriptor(),
            desired.registration_body(ResourceKind::Document.descriptor()),
            &transfer,
            &tokio_util::sync::CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.parts()[0].completion_tag(), Some("etag-1"));
    assert_eq!(session.parts()[1].completion_tag(), None);
    match &err {
        CoreError::Abandoned {
            resource_id,
            upload_id,
            ..
        } => {
            assert_eq!(resource_id, "doc-1");
            assert_eq!(upload_id, "up-1");
        }
        other => panic!("expected Abandoned, got: {other:?}"),
    }
    assert!(matches!(
        err.root_cause(),
        CoreError::Transport {
            phase: Phase::UploadPart(2),
            ..
        }
    ));
}

#[tokio::test]
async fn test_license_without_file_registers_placeholder() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/assets/v1/license"))
        .and(body_json(json!({
            "vendor_id": "ven-1",
            "serial_id": "SN-1",
            "product": "CodeMeter",
            "parts": 1,
            "file_name": "SDA_License.vhdx"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "upload_urls": [{ "part_number": 1, "upload_url": format!("{}/s3/part1", server.uri()) }],
            "upload_id": "up-7",
            "license_id": "lic-1",
            "object_version": 1,
            "vendor_id": "ven-1",
            "serial_id": "SN-1",
            "product": "CodeMeter",
            "type": "floating",
            "status": "active",
            "quantity": 1,
            "name": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/assets/v1/license/lic-1/file"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let desired = DesiredConfig::new(ResourceKind::License)
        .with("vendor_id", text("ven-1"))
        .with("serial_id", text("SN-1"))
        .with("product", text("CodeMeter"))
        .with("name", Field::Clear);

    let snapshot = service(&server, UploadOptions::default())
        .create(&desired)
        .await
        .unwrap();

    assert_eq!(snapshot.id, "lic-1");
    assert_eq!(snapshot.file, None);
    assert_eq!(snapshot.field("quantity"), Some(&FieldValue::Integer(1)));
    assert_eq!(snapshot.field("name"), None);
}

#[tokio::test]
async fn test_forbidden_register_is_not_abandoned() {
    let server = MockServer::start().await;
    let file = source_file(b"abc");

    Mock::given(method("POST"))
        .and(path("/assets/v1/document"))
        .respond_with(ResponseTemplate::new(403).set_body_string("token lacks assets:write"))
        .mount(&server)
        .await;

    let err = service(&server, UploadOptions::default())
        .create(&document(&file))
        .await
        .unwrap_err();

    assert!(
        matches!(err, CoreError::Forbidden { phase: Phase::Register, ref body } if body.contains("assets:write")),
        "expected Forbidden, got: {err:?}"
    );
}

#[tokio::test]
async fn test_missing_required_file_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let desired = DesiredConfig::new(ResourceKind::Project).with("name", text("P"));
    let err = service(&server, UploadOptions::default())
        .create(&desired)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

// ── Cancellation & retry ────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_before_register_sends_nothing() {
    let server = MockServer::start().await;
    let file = source_file(b"abc");
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let svc = service(&server, UploadOptions::default());
    svc.cancellation_token().cancel();

    let err = svc.create(&document(&file)).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Cancelled {
            phase: Phase::Register
        }
    ));
}

#[tokio::test]
async fn test_cancel_during_register_reports_register_phase() {
    let server = MockServer::start().await;
    let file = source_file(b"abc");
    Mock::given(method("POST"))
        .and(path("/assets/v1/document"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(document_registration(targets(&server, 1)))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"x\""))
        .expect(0)
        .mount(&server)
        .await;

    let svc = service(&server, UploadOptions::default());
    let token = svc.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let err = svc.create(&document(&file)).await.unwrap_err();
    assert!(
        matches!(
            err,
            CoreError::Cancelled {
                phase: Phase::Register
            }
        ),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_cancel_during_upload_abandons_without_finalize() {
    let server = MockServer::start().await;
    let file = source_file(b"abcdefghij");

    Mock::given(method("POST"))
        .and(path("/assets/v1/document"))
        .respond_with(ResponseTemplate::new(201).set_body_json(document_registration(targets(&server, 1))))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"slow\"")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex("complete_upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let svc = service(&server, UploadOptions::default());
    let token = svc.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let err = svc.create(&document(&file)).await.unwrap_err();
    assert!(matches!(err, CoreError::Abandoned { .. }), "got: {err:?}");
    assert!(matches!(
        err.root_cause(),
        CoreError::Cancelled {
            phase: Phase::UploadPart(1)
        }
    ));
}

#[tokio::test]
async fn test_retry_policy_recovers_from_503() {
    let server = MockServer::start().await;
    let file = source_file(b"abcd");

    Mock::given(method("POST"))
        .and(path("/assets/v1/document"))
        .respond_with(ResponseTemplate::new(201).set_body_json(document_registration(targets(&server, 1))))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/s3/part1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("SlowDown"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_parts(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/assets/v1/document/doc-1/version/v-1/complete_upload/up-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let retry = RetryPolicy {
        backoff_base: Duration::from_millis(10),
        ..RetryPolicy::attempts(3)
    };
    let snapshot = service(&server, UploadOptions {
        retry,
        ..UploadOptions::default()
    })
    .create(&document(&file))
    .await
    .unwrap();
    assert_eq!(snapshot.id, "doc-1");
}

#[tokio::test]
async fn test_default_policy_does_not_retry() {
    let server = MockServer::start().await;
    let file = source_file(b"abcd");

    Mock::given(method("POST"))
        .and(path("/assets/v1/document"))
        .respond_with(ResponseTemplate::new(201).set_body_json(document_registration(targets(&server, 1))))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = service(&server, UploadOptions::default())
        .create(&document(&file))
        .await
        .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        CoreError::Server {
            phase: Phase::UploadPart(1),
            status: 503,
            ..
        }
    ));
}

// ── Read / update / delete ──────────────────────────────────────────

#[tokio::test]
async fn test_update_sends_minimal_patch() {
    let server = MockServer::start().await;
    let file = source_file(b"abcdefghij");
    let state = tracked_document(&file);

    Mock::given(method("PATCH"))
        .and(path("/assets/v1/document/doc-1"))
        .and(body_json(json!({
            "name": "Manual v2",
            "group_id": "",
            "object_version": 3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document_id": "doc-1",
            "object_version": 4,
            "name": "Manual v2",
            "document_type": "pdf",
            "group_id": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let desired = DesiredConfig::new(ResourceKind::Document)
        .with("name", text("Manual v2"))
        .with("document_type", text("pdf"))
        .with("group_id", Field::Clear)
        .with_source(file.path());

    let updated = service(&server, UploadOptions::default())
        .update(&desired, &state)
        .await
        .unwrap();

    assert_eq!(updated.object_version, 4);
    assert_eq!(updated.field("group_id"), None);
    assert_eq!(updated.file, state.file);
}

#[tokio::test]
async fn test_update_keeps_cleared_field_absent_despite_stale_echo() {
    let server = MockServer::start().await;
    let file = source_file(b"abcdefghij");
    let state = tracked_document(&file);

    Mock::given(method("PATCH"))
        .and(path("/assets/v1/document/doc-1"))
        .and(body_json(json!({ "group_id": "", "object_version": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document_id": "doc-1",
            "object_version": 4,
            "name": "Manual",
            "document_type": "pdf",
            "group_id": "g-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let desired = DesiredConfig::new(ResourceKind::Document)
        .with("name", text("Manual"))
        .with("document_type", text("pdf"))
        .with("group_id", Field::Clear)
        .with_source(file.path());

    let updated = service(&server, UploadOptions::default())
        .update(&desired, &state)
        .await
        .unwrap();

    assert_eq!(updated.object_version, 4);
    assert_eq!(updated.field("group_id"), None);
    assert_eq!(
        updated.field("name"),
        Some(&FieldValue::Text("Manual".into()))
    );
}

#[tokio::test]
async fn test_update_conflict_is_reported() {
    let server = MockServer::start().await;
    let file = source_file(b"abcdefghij");

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(409).set_body_string("stale object_version"))
        .mount(&server)
        .await;

    let desired = DesiredConfig::new(ResourceKind::Document)
        .with("name", text("Other"))
        .with_source(file.path());
    let err = service(&server, UploadOptions::default())
        .update(&desired, &tracked_document(&file))
        .await
        .unwrap_err();

    assert!(
        matches!(err, CoreError::ConcurrencyConflict { version: 3, ref id, .. } if id == "doc-1"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_noop_update_sends_nothing() {
    let server = MockServer::start().await;
    let file = source_file(b"abcdefghij");
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let state = tracked_document(&file);
    let desired = DesiredConfig::new(ResourceKind::Document)
        .with("name", text("Manual"))
        .with_source(file.path());

    let same = service(&server, UploadOptions::default())
        .update(&desired, &state)
        .await
        .unwrap();
    assert_eq!(same, state);
}

#[tokio::test]
async fn test_create_only_change_is_refused() {
    let server = MockServer::start().await;
    let file = source_file(b"abcdefghij");
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let desired = DesiredConfig::new(ResourceKind::Document)
        .with("document_type", text("docx"))
        .with_source(file.path());
    let err = service(&server, UploadOptions::default())
        .update(&desired, &tracked_document(&file))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { ref message } if message.contains("document_type")));
}

#[tokio::test]
async fn test_read_not_found_drops_state() {
    let server = MockServer::start().await;
    let file = source_file(b"x");
    Mock::given(method("GET"))
        .and(path("/assets/v1/document/doc-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = service(&server, UploadOptions::default())
        .read(&tracked_document(&file))
        .await
        .unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_read_refreshes_version() {
    let server = MockServer::start().await;
    let file = source_file(b"x");
    Mock::given(method("GET"))
        .and(path("/assets/v1/document/doc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document_id": "doc-1",
            "object_version": 9,
            "update_user_id": "u-2",
            "name": "Manual",
            "document_type": "pdf",
            "group_id": null
        })))
        .mount(&server)
        .await;

    let fresh = service(&server, UploadOptions::default())
        .read(&tracked_document(&file))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.object_version, 9);
    assert_eq!(fresh.field("group_id"), None);
    assert_eq!(fresh.audit.update_user_id.as_deref(), Some("u-2"));
}

#[tokio::test]
async fn test_delete_not_found_is_ok() {
    let server = MockServer::start().await;
    let file = source_file(b"x");
    Mock::given(method("DELETE"))
        .and(path("/assets/v1/document/doc-1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    service(&server, UploadOptions::default())
        .delete(&tracked_document(&file))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_server_error_surfaces() {
    let server = MockServer::start().await;
    let file = source_file(b"x");
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
        .mount(&server)
        .await;

    let err = service(&server, UploadOptions::default())
        .delete(&tracked_document(&file))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Server {
            phase: Phase::Delete,
            status: 500,
            ..
        }
    ));
}
