use std::path::Path;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kadr_core::{
    MediaProber, PipelineError, SizeLimit, TelegramFetcher, UsageStore, VideoPipeline,
    VideoRequest,
};

const TOKEN: &str = "42:test-token";

fn request(file_id: &str, declared_size: u64) -> VideoRequest {
    VideoRequest {
        user_id: 777,
        username: Some("tester".into()),
        file_id: file_id.to_string(),
        declared_size,
        file_name: Some("clip.mp4".into()),
    }
}

fn build_pipeline(dir: &TempDir, server: &MockServer, ffprobe: &str) -> VideoPipeline {
    let store = UsageStore::builder()
        .path(dir.path().join("usage.sqlite"))
        .build()
        .unwrap();
    store.initialize().unwrap();
    let limit = SizeLimit::default();
    let fetcher = TelegramFetcher::new(server.uri(), TOKEN, limit).unwrap();
    let prober = MediaProber::new(ffprobe, "kadr-test-no-such-ffmpeg");
    VideoPipeline::new(limit, fetcher, prober, store, dir.path().join("downloads"))
}

fn store_handle(dir: &TempDir) -> UsageStore {
    UsageStore::builder()
        .path(dir.path().join("usage.sqlite"))
        .build()
        .unwrap()
}

/// Stub prober printing a fixed ffprobe payload, so no real ffprobe is
/// needed.
#[cfg(unix)]
fn write_ffprobe_stub(dir: &Path) -> String {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("ffprobe-stub");
    std::fs::write(
        &script,
        "#!/bin/sh\n\
         cat <<'EOF'\n\
         {\"format\": {\"duration\": \"12.345\"},\n\
          \"streams\": [{\"codec_type\": \"video\", \"width\": 1920,\n\
                        \"height\": 1080, \"r_frame_rate\": \"30000/1001\"}]}\n\
         EOF\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script.to_string_lossy().to_string()
}

async fn mount_video(server: &MockServer, file_id: &str, remote_path: &str, payload: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .and(query_param("file_id", file_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"file_path": remote_path}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/file/bot{TOKEN}/{remote_path}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.to_vec()))
        .mount(server)
        .await;
}

#[cfg(unix)]
#[tokio::test]
async fn successful_request_summarizes_and_records_once() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_video(&server, "ok-video", "videos/ok.mp4", b"fake video body").await;
    let ffprobe = write_ffprobe_stub(dir.path());
    let pipeline = build_pipeline(&dir, &server, &ffprobe);

    let request = request("ok-video", 15);
    let processed = pipeline.process(&request).await.expect("pipeline succeeds");

    assert!(processed.summary.contains("12.3"));
    assert!(processed.summary.contains("1920x1080"));
    assert!(processed.summary.contains("29.7"));
    assert!(
        !pipeline.temp_path(&request).exists(),
        "temp file must be removed after success"
    );
    let stats = store_handle(&dir).stats().unwrap();
    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.total_videos, 1);
}

#[tokio::test]
async fn resolve_failure_is_relayed_and_not_recorded() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Bad Request"
        })))
        .mount(&server)
        .await;
    let pipeline = build_pipeline(&dir, &server, "kadr-test-no-such-probe");

    let request = request("broken", 1024);
    let err = pipeline
        .process(&request)
        .await
        .expect_err("resolve failure fails the flow");

    assert!(matches!(err, PipelineError::Fetch(_)));
    assert!(err.user_message().contains("информацию о файле"));
    assert!(!pipeline.temp_path(&request).exists());
    assert_eq!(store_handle(&dir).stats().unwrap().total_videos, 0);
}

#[tokio::test]
async fn oversized_request_fails_before_any_network_call() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let pipeline = build_pipeline(&dir, &server, "kadr-test-no-such-probe");

    let request = request("huge", 3 * 1024 * 1024 * 1024);
    let err = pipeline
        .process(&request)
        .await
        .expect_err("3 GB exceeds the ceiling");

    let message = err.user_message();
    assert!(message.contains("3.0 GB"), "got: {message}");
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!pipeline.temp_path(&request).exists());
    assert_eq!(store_handle(&dir).stats().unwrap().total_videos, 0);
}

#[tokio::test]
async fn missing_probe_tool_degrades_to_sentinel_summary() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_video(&server, "no-probe", "videos/raw.bin", b"not really a video").await;
    let pipeline = build_pipeline(&dir, &server, "kadr-test-no-such-probe");

    let request = request("no-probe", 18);
    let processed = pipeline
        .process(&request)
        .await
        .expect("probe failure must not fail the flow");

    assert!(processed.summary.contains("Unknown"));
    assert!(!pipeline.temp_path(&request).exists());
    assert_eq!(store_handle(&dir).stats().unwrap().total_videos, 1);
}

#[tokio::test]
async fn download_and_finish_split_keeps_the_cleanup_guarantee() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_video(&server, "two-phase", "videos/two.mp4", b"body").await;
    let pipeline = build_pipeline(&dir, &server, "kadr-test-no-such-probe");

    let request = request("two-phase", 4);
    let fetched = pipeline.download(&request).await.unwrap();
    assert!(fetched.path().exists());

    // Dropping without finish still removes the temp file.
    drop(fetched);
    assert!(!pipeline.temp_path(&request).exists());
}
