//! End-to-end refresh cycles against a mock HTTP server.
//!
//! Each test starts its own `MockServer`, so feeds never touch the network.

use pretty_assertions::assert_eq;
use rreader::feed::{Category, FeedFetcher, FeedHealth, FeedSource};
use rreader::refresh::{RefreshController, RefreshEvent, RefreshRequest, SnapshotStore};
use rreader::util::build_http_client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rss(items: &[(&str, &str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(guid, title, date)| {
            format!(
                "<item><guid>{}</guid><title>{}</title><link>https://example.com/{}</link><pubDate>{}</pubDate></item>",
                guid, title, guid, date
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Feed</title>{}</channel></rss>"#,
        body
    )
}

fn three_items() -> String {
    rss(&[
        ("b1", "First", "Mon, 03 Jun 2024 10:00:00 GMT"),
        ("b2", "Second", "Mon, 03 Jun 2024 09:00:00 GMT"),
        ("b3", "Third", "Mon, 03 Jun 2024 08:00:00 GMT"),
    ])
}

fn category(server: &MockServer, paths: &[(&str, &str)]) -> Arc<Category> {
    Arc::new(Category {
        id: Arc::from("tech"),
        title: "Tech".to_string(),
        ordinal: 1,
        show_author: false,
        feeds: paths
            .iter()
            .enumerate()
            .map(|(order, (name, p))| {
                Arc::new(FeedSource {
                    name: Arc::from(*name),
                    url: format!("{}{}", server.uri(), p),
                    category_id: Arc::from("tech"),
                    order,
                })
            })
            .collect(),
    })
}

fn controller(store: SnapshotStore) -> RefreshController {
    let fetcher = FeedFetcher::new(build_http_client().unwrap())
        .with_timeout(Duration::from_millis(200))
        .with_retry_backoff(Duration::from_millis(10));
    RefreshController::new(fetcher, store)
}

async fn mount_ok(server: &MockServer, p: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/rss+xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

async fn mount_slow(server: &MockServer, p: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(three_items())
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

async fn wait_for_finish(rx: &mut mpsc::Receiver<RefreshEvent>, want: u64) {
    let finished = async {
        while let Some(event) = rx.recv().await {
            if matches!(event, RefreshEvent::Finished { cycle, .. } if cycle == want) {
                return;
            }
        }
        panic!("event channel closed before cycle {} finished", want);
    };
    tokio::time::timeout(Duration::from_secs(5), finished)
        .await
        .unwrap();
}

// ============================================================================
// Partial failure
// ============================================================================

#[tokio::test]
async fn test_timeout_feed_reports_error_others_still_shown() {
    let server = MockServer::start().await;
    mount_slow(&server, "/a", Duration::from_secs(5)).await;
    mount_ok(&server, "/b", three_items()).await;

    let category = category(&server, &[("A", "/a"), ("B", "/b")]);
    let controller = controller(SnapshotStore::new());
    controller.refresh(&[Arc::clone(&category)]).await;

    let snapshot = controller.store().get("tech").unwrap();
    let titles: Vec<&str> = snapshot.entries.iter().map(|e| &*e.title).collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);
    assert!(snapshot.entries.iter().all(|e| &*e.source_name == "B"));

    assert!(snapshot.feed_health[0].health.is_error());
    assert!(snapshot.feed_health[1].health.is_ok());
    assert!(!snapshot.all_failed());
    match &snapshot.feed_health[0].health {
        FeedHealth::Error { reason, .. } => assert_eq!(reason, "Request timed out"),
        other => panic!("expected error health, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_feed_keeps_last_known_entries_as_stale() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&[(
            "a1",
            "Cached",
            "Mon, 03 Jun 2024 12:00:00 GMT",
        )])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_ok(&server, "/b", three_items()).await;

    let category = category(&server, &[("A", "/a"), ("B", "/b")]);
    let controller = controller(SnapshotStore::new());
    let categories = [category];

    controller.refresh(&categories).await;
    let first = controller.store().get("tech").unwrap();
    assert!(first.feed_health[0].health.is_ok());
    assert_eq!(first.entries.len(), 4);

    controller.refresh(&categories).await;
    let second = controller.store().get("tech").unwrap();
    assert_eq!(second.cycle, 2);
    assert!(second.feed_health[0].health.is_stale());
    assert_eq!(second.entries.len(), 4);

    let cached = second
        .entries
        .iter()
        .find(|e| &*e.title == "Cached")
        .unwrap();
    assert!(second.is_stale(cached));
    assert_eq!(second.failing_sources(), 1);
}

#[tokio::test]
async fn test_every_feed_failing_marks_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let category = category(&server, &[("A", "/a"), ("B", "/b")]);
    let controller = controller(SnapshotStore::new());
    controller.refresh(&[category]).await;

    let snapshot = controller.store().get("tech").unwrap();
    assert!(snapshot.entries.is_empty());
    assert!(snapshot.all_failed());
}

// ============================================================================
// Conditional requests
// ============================================================================

#[tokio::test]
async fn test_not_modified_reuses_cached_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .set_body_string(three_items()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let category = category(&server, &[("B", "/b")]);
    let controller = controller(SnapshotStore::new());
    let categories = [category];

    controller.refresh(&categories).await;
    let first = controller.store().get("tech").unwrap();

    controller.refresh(&categories).await;
    let second = controller.store().get("tech").unwrap();

    assert_eq!(second.cycle, 2);
    assert!(second.feed_health[0].health.is_ok());
    assert_eq!(first.entries, second.entries);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_newer_cycle_supersedes_older_one() {
    let server = MockServer::start().await;
    mount_slow(&server, "/b", Duration::from_millis(100)).await;

    let category = category(&server, &[("B", "/b")]);
    let controller = controller(SnapshotStore::new());
    let categories = [category];

    let (older, newer) = tokio::join!(controller.refresh(&categories), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        controller.refresh(&categories).await
    });

    assert!(older.is_empty());
    assert_eq!(newer.get("tech").map(|s| s.cycle), Some(2));
    assert_eq!(controller.store().get("tech").unwrap().cycle, 2);
    assert_eq!(controller.store().get("tech").unwrap().entries.len(), 3);
}

#[tokio::test]
async fn test_events_report_progress_and_publication() {
    let server = MockServer::start().await;
    mount_ok(&server, "/a", three_items()).await;
    mount_ok(&server, "/b", rss(&[("c1", "Other", "Sun, 02 Jun 2024 10:00:00 GMT")])).await;

    let category = category(&server, &[("A", "/a"), ("B", "/b")]);
    let (tx, mut rx) = mpsc::channel(16);
    let controller = controller(SnapshotStore::new()).with_events(tx);
    controller.refresh(&[category]).await;
    drop(controller);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.first(), Some(&RefreshEvent::Started { cycle: 1, total: 2 }));
    assert!(events.contains(&RefreshEvent::Progress {
        cycle: 1,
        done: 2,
        total: 2
    }));
    assert!(events.contains(&RefreshEvent::Published {
        cycle: 1,
        category_id: Arc::from("tech")
    }));
    assert_eq!(events.last(), Some(&RefreshEvent::Finished { cycle: 1, failed: 0 }));
}

#[tokio::test]
async fn test_background_loop_runs_manual_refresh() {
    let server = MockServer::start().await;
    mount_ok(&server, "/b", three_items()).await;

    let category = category(&server, &[("B", "/b")]);
    let store = SnapshotStore::new();
    let (tx, mut rx) = mpsc::channel(64);
    let controller = Arc::new(controller(store.clone()).with_events(tx));
    let handle = controller.start_background(vec![category], None);

    wait_for_finish(&mut rx, 1).await;
    assert_eq!(store.get("tech").unwrap().cycle, 1);

    // Let the loop go back to waiting; Finished is sent before the cycle ends.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut request = handle.request_refresh();
    for _ in 0..50 {
        if request != RefreshRequest::AlreadyRunning {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        request = handle.request_refresh();
    }
    assert_eq!(request, RefreshRequest::Queued);

    wait_for_finish(&mut rx, 2).await;
    assert_eq!(store.get("tech").unwrap().cycle, 2);

    handle.shutdown();
}
