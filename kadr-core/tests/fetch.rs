use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kadr_core::{FetchError, SizeLimit, TelegramFetcher};

const TOKEN: &str = "42:test-token";

fn fetcher(server: &MockServer) -> TelegramFetcher {
    TelegramFetcher::new(server.uri(), TOKEN, SizeLimit::default()).expect("build fetcher")
}

#[tokio::test]
async fn fetch_streams_resolved_file_to_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .and(query_param("file_id", "file-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"file_path": "videos/file_1.mp4"}
        })))
        .mount(&server)
        .await;
    let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    Mock::given(method("GET"))
        .and(path(format!("/file/bot{TOKEN}/videos/file_1.mp4")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("file-1.mp4");
    let local = fetcher(&server)
        .fetch("file-1", payload.len() as u64, &dest)
        .await
        .expect("fetch succeeds");

    assert_eq!(local, dest);
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
}

#[tokio::test]
async fn rejected_envelope_is_a_resolve_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: file is too big"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("x.mp4");
    let err = fetcher(&server)
        .fetch("file-2", 1024, &dest)
        .await
        .expect_err("ok=false must fail");
    assert!(matches!(err, FetchError::Resolve(_)));
    assert!(err.user_message().contains("информацию о файле"));
    assert!(!dest.exists());
}

#[tokio::test]
async fn non_success_status_on_resolve_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = fetcher(&server)
        .fetch("file-3", 1024, &dir.path().join("x.mp4"))
        .await
        .expect_err("502 must fail");
    assert!(matches!(err, FetchError::Resolve(_)));
}

#[tokio::test]
async fn non_success_status_on_download_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"file_path": "videos/gone.mp4"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/file/bot{TOKEN}/videos/gone.mp4")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("gone.mp4");
    let err = fetcher(&server)
        .fetch("file-4", 1024, &dest)
        .await
        .expect_err("404 must fail");
    assert!(matches!(err, FetchError::Download(_)));
    assert!(err.user_message().contains("скачать"));
    assert!(!dest.exists());
}

#[tokio::test]
async fn oversized_declared_size_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = fetcher(&server)
        .fetch("file-5", 3 * 1024 * 1024 * 1024, &dir.path().join("x.mp4"))
        .await
        .expect_err("3 GB exceeds the ceiling");
    assert!(matches!(err, FetchError::TooLarge(_)));
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty(), "no request may be issued: {requests:?}");
}
