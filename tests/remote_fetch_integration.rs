//! Integration tests for remote playlist retrieval with retries.

use std::error::Error as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use m3u_organizer_core::download::{DownloadError, HttpClient, RetryPolicy};
use m3u_organizer_core::CancellationToken;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, Respond, ResponseTemplate};

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return socket_skip_return();
        };
        mock_server
    }};
}

const RETRY_DELAY: Duration = Duration::from_millis(50);

fn playlist_body() -> Vec<u8> {
    let mut body = String::from("#EXTM3U\n");
    for i in 0..10 {
        body.push_str(&format!(
            "#EXTINF:-1 group-title=\"Films\",Movie {i}\nhttp://h/movie/u/p/{i}.mkv\n"
        ));
    }
    body.into_bytes()
}

/// Fails the first `fail_count` requests with 500, then serves `success_body`.
struct FlakyResponder {
    request_count: Arc<AtomicUsize>,
    fail_count: usize,
    success_body: Vec<u8>,
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.request_count.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(500).set_body_bytes(b"internal server error".to_vec())
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.success_body.clone())
        }
    }
}

#[tokio::test]
async fn test_fetch_playlist_succeeds_first_try() {
    let mock_server = require_mock_server!();
    let body = playlist_body();
    Mock::given(method("GET"))
        .and(path("/get.php"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let dest = temp_dir.path().join("lists/tv.m3u");
    let url = format!("{}/get.php", mock_server.uri());

    let mut reports = Vec::new();
    let outcome = HttpClient::new()
        .fetch_playlist(
            &url,
            &dest,
            &RetryPolicy::new(3, RETRY_DELAY),
            |p| reports.push(p),
            &CancellationToken::new(),
        )
        .await
        .expect("fetch should succeed");

    assert_eq!(std::fs::read(&dest).expect("read dest"), body);
    assert_eq!(outcome.bytes_on_disk, body.len() as u64);
    assert!(reports.last().is_some_and(|p| p.is_done()));
}

#[tokio::test]
async fn test_fetch_playlist_recovers_after_transient_failures() {
    let mock_server = require_mock_server!();
    let request_count = Arc::new(AtomicUsize::new(0));
    Mock::given(method("GET"))
        .and(path("/get.php"))
        .respond_with(FlakyResponder {
            request_count: Arc::clone(&request_count),
            fail_count: 2,
            success_body: playlist_body(),
        })
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let dest = temp_dir.path().join("tv.m3u");
    let url = format!("{}/get.php", mock_server.uri());

    let outcome = HttpClient::new()
        .fetch_playlist(
            &url,
            &dest,
            &RetryPolicy::new(3, RETRY_DELAY),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .expect("third attempt should succeed");

    assert_eq!(request_count.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.bytes_on_disk, playlist_body().len() as u64);
}

#[tokio::test]
async fn test_fetch_playlist_gives_up_after_three_attempts() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/get.php"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let url = format!("{}/get.php", mock_server.uri());

    let started = Instant::now();
    let result = HttpClient::new()
        .fetch_playlist(
            &url,
            &temp_dir.path().join("tv.m3u"),
            &RetryPolicy::new(3, RETRY_DELAY),
            |_| {},
            &CancellationToken::new(),
        )
        .await;

    let error = result.expect_err("expected failure");
    assert!(
        matches!(error, DownloadError::RetriesExhausted { attempts: 3, .. }),
        "got {error:?}"
    );
    let source = error
        .source()
        .and_then(|s| s.downcast_ref::<DownloadError>())
        .expect("last error is the source");
    assert!(matches!(
        source,
        DownloadError::HttpStatus { status: 503, .. }
    ));
    assert!(
        started.elapsed() >= RETRY_DELAY * 2,
        "waits between attempts"
    );
}

#[tokio::test]
async fn test_fetch_playlist_rejects_tiny_body() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/get.php"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"#EXTM3U\n".to_vec()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let url = format!("{}/get.php", mock_server.uri());

    let result = HttpClient::new()
        .fetch_playlist(
            &url,
            &temp_dir.path().join("tv.m3u"),
            &RetryPolicy::new(2, RETRY_DELAY),
            |_| {},
            &CancellationToken::new(),
        )
        .await;

    let error = result.expect_err("tiny playlist must fail");
    let source = error
        .source()
        .and_then(|s| s.downcast_ref::<DownloadError>())
        .expect("last error is the source");
    assert!(
        matches!(source, DownloadError::PlaylistTooSmall { bytes: 8, minimum: 100, .. }),
        "got {source:?}"
    );
}

#[tokio::test]
async fn test_fetch_playlist_invalid_url_is_not_retried() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let result = HttpClient::new()
        .fetch_playlist(
            "not a url",
            &temp_dir.path().join("tv.m3u"),
            &RetryPolicy::new(3, RETRY_DELAY),
            |_| {},
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
}

#[tokio::test]
async fn test_fetch_playlist_cancelled_during_retry_delay() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/get.php"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let url = format!("{}/get.php", mock_server.uri());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let result = HttpClient::new()
        .fetch_playlist(
            &url,
            &temp_dir.path().join("tv.m3u"),
            &RetryPolicy::new(3, Duration::from_secs(30)),
            |_| {},
            &cancel,
        )
        .await;

    assert!(
        matches!(result, Err(DownloadError::Cancelled { .. })),
        "got {result:?}"
    );
}
