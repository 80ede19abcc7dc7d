//! Integration tests for rate-limited transfer and the full pipeline against
//! a mock site.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use v2dl_core::download::{
    ByteRateLimit, DownloadTask, ItemOutcome, RateLimitedTransfer, TaskHandler,
};
use v2dl_core::fetch::HttpRenderSession;
use v2dl_core::parser::{MediaRef, Target};
use v2dl_core::{Orchestrator, RunSummary, Settings};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::session::album_page;
use support::socket_guard::start_mock_server_or_skip;

fn task(server: &str, items: &[(&str, &str)]) -> DownloadTask {
    DownloadTask {
        album_id: format!("{server}/album/a"),
        folder: "Album A".to_string(),
        items: items
            .iter()
            .map(|(p, caption)| MediaRef::new(format!("{server}{p}"), *caption))
            .collect(),
        record_on_completion: false,
    }
}

// ==================== Idempotence Tests ====================

#[tokio::test]
async fn test_second_run_skips_everything_without_requests() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    for (p, body) in [("/m/1.jpg", "one"), ("/m/2.png", "two")] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.as_bytes().to_vec()))
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    let temp_dir = TempDir::new().unwrap();
    let transfer = RateLimitedTransfer::new(temp_dir.path(), ByteRateLimit::disabled()).unwrap();
    let task = task(&mock_server.uri(), &[("/m/1.jpg", "A 1"), ("/m/2.png", "A 2")]);

    let first = transfer.handle(&task).await.unwrap();
    let second = transfer.handle(&task).await.unwrap();

    assert_eq!(first.downloaded, 2);
    assert_eq!(first.bytes, 6);
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.bytes, 0);
    let album = temp_dir.path().join("Album A");
    assert_eq!(std::fs::read(album.join("A 1.jpg")).unwrap(), b"one");
    assert_eq!(std::fs::read(album.join("A 2.png")).unwrap(), b"two");
    // expect(1) on each mock is verified when the server drops.
}

#[tokio::test]
async fn test_existing_file_is_skipped_item() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("x.jpg"), b"done").unwrap();
    let transfer = RateLimitedTransfer::new(temp_dir.path(), ByteRateLimit::disabled()).unwrap();

    let outcome = transfer
        .transfer_item(
            temp_dir.path(),
            "x.jpg",
            &MediaRef::new("http://127.0.0.1:9/x.jpg", "x"),
            None,
        )
        .await;

    assert!(matches!(outcome, ItemOutcome::Skipped { .. }));
}

#[tokio::test]
async fn test_duplicate_captions_get_distinct_files() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
        .mount(&mock_server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let transfer = RateLimitedTransfer::new(temp_dir.path(), ByteRateLimit::disabled()).unwrap();

    let report = transfer
        .handle(&task(
            &mock_server.uri(),
            &[("/m/a.jpg", "Same"), ("/m/b.jpg", "Same")],
        ))
        .await
        .unwrap();

    assert_eq!(report.downloaded, 2);
    let album = temp_dir.path().join("Album A");
    assert!(album.join("Same.jpg").exists());
    assert!(album.join("Same_2.jpg").exists());
}

// ==================== Rate Ceiling Tests ====================

#[tokio::test]
async fn test_transfer_respects_rate_ceiling() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let body = vec![7u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/m/big.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&mock_server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let transfer =
        RateLimitedTransfer::new(temp_dir.path(), ByteRateLimit::from_kib_per_sec(32)).unwrap();

    let start = Instant::now();
    let report = transfer
        .handle(&task(&mock_server.uri(), &[("/m/big.jpg", "Big")]))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.bytes, 64 * 1024);
    // 64 KiB at 32 KiB/s cannot finish in under two seconds.
    assert!(
        elapsed >= Duration::from_millis(1950),
        "finished too fast: {elapsed:?}"
    );
    let written = std::fs::read(temp_dir.path().join("Album A").join("Big.jpg")).unwrap();
    assert_eq!(written, body);
}

// ==================== End-to-End Tests ====================

async fn run_once(settings: Settings, target: &Target) -> RunSummary {
    let session = HttpRenderSession::new().unwrap();
    let transfer = RateLimitedTransfer::new(&settings.download_dir, settings.rate_limit()).unwrap();
    Orchestrator::new(settings, Arc::new(session), transfer)
        .unwrap()
        .run(std::slice::from_ref(target))
        .await
}

#[tokio::test]
async fn test_album_downloads_end_to_end_and_is_skipped_next_run() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let uri = mock_server.uri();
    Mock::given(method("GET"))
        .and(path("/album/set-42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(album_page(
            &[("/img/1.jpg", Some("Beach Set 1")), ("/img/2.jpg", None)],
            1,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/2.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut settings = Settings::with_download_dir(temp_dir.path());
    settings.base_url = uri.clone();
    settings.page_delay_min_secs = 0.0;
    settings.page_delay_max_secs = 0.0;
    settings.rate_limit_kib = 0;
    let target = Target::parse(&format!("{uri}/album/set-42")).unwrap();

    let first = run_once(settings.clone(), &target).await;
    assert_eq!(first.albums_enqueued, 1);
    assert_eq!(first.items_downloaded, 2);
    let album = temp_dir.path().join("Beach Set");
    assert_eq!(std::fs::read(album.join("Beach Set 1.jpg")).unwrap(), b"first");
    assert_eq!(std::fs::read(album.join("1.jpg")).unwrap(), b"second");

    let second = run_once(settings, &target).await;
    assert_eq!(second.albums_skipped, 1);
    assert_eq!(second.items_downloaded, 0);
    assert!(!second.all_targets_failed());
}
