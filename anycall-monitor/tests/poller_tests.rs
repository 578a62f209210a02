use anycall_core::LogEntry;
use anycall_monitor::terminal;
use anycall_monitor::{LogSource, LogView, MonitorError, Poller};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tokio::time::timeout;

// ── Helper ────────────────────────────────────────────────────

/// Replays queued responses; once drained, repeats the last successful one.
#[derive(Default)]
struct Scripted {
    queue: Mutex<VecDeque<Result<Vec<LogEntry>, MonitorError>>>,
    fallback: Mutex<Vec<LogEntry>>,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn new(responses: Vec<Result<Vec<LogEntry>, MonitorError>>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl LogSource for Scripted {
    async fn fetch(&self) -> Result<Vec<LogEntry>, MonitorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(Ok(rows)) => {
                *self.fallback.lock().unwrap() = rows.clone();
                Ok(rows)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }
}

fn rows(methods: &[&str]) -> Vec<LogEntry> {
    methods.iter().map(|m| LogEntry::new(*m)).collect()
}

fn methods(view: &LogView) -> Vec<String> {
    view.rows().iter().map(|e| e.method.clone()).collect()
}

async fn next_view(rx: &mut watch::Receiver<LogView>) -> LogView {
    timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("no view published in time")
        .expect("poller dropped");
    rx.borrow_and_update().clone()
}

// ── poll_once ─────────────────────────────────────────────────

#[tokio::test]
async fn successful_fetch_replaces_view() {
    let poller = Poller::new(Scripted::new(vec![Ok(rows(&["GET", "POST"]))]), Duration::from_secs(5));
    assert!(poller.poll_once().await);
    let view = poller.view().borrow().clone();
    assert_eq!(methods(&view), ["GET", "POST"]);
    assert!(view.fetched_at().is_some());
}

#[tokio::test]
async fn failed_fetch_keeps_previous_view() {
    let poller = Poller::new(
        Scripted::new(vec![Ok(rows(&["GET"])), Err(MonitorError::Status(503))]),
        Duration::from_secs(5),
    );
    assert!(poller.poll_once().await);
    let before = poller.view().borrow().clone();

    assert!(!poller.poll_once().await);
    let after = poller.view().borrow().clone();
    assert_eq!(methods(&after), ["GET"]);
    assert_eq!(after.fetched_at(), before.fetched_at());
}

#[tokio::test]
async fn failed_first_fetch_leaves_empty_view() {
    let poller = Poller::new(
        Scripted::new(vec![Err(MonitorError::Status(500))]),
        Duration::from_secs(5),
    );
    assert!(!poller.poll_once().await);
    let view = poller.view().borrow().clone();
    assert!(view.is_empty());
    assert!(view.fetched_at().is_none());
}

#[tokio::test]
async fn each_fetch_replaces_rather_than_merges() {
    let poller = Poller::new(
        Scripted::new(vec![Ok(rows(&["GET", "POST"])), Ok(rows(&["DELETE"]))]),
        Duration::from_secs(5),
    );
    poller.poll_once().await;
    poller.poll_once().await;
    assert_eq!(methods(&poller.view().borrow()), ["DELETE"]);
}

// ── Background task ───────────────────────────────────────────

#[tokio::test]
async fn spawned_poller_fetches_immediately() {
    let handle = Poller::new(Scripted::new(vec![Ok(rows(&["PUT"]))]), Duration::from_secs(3600)).spawn();
    let mut rx = handle.view();
    let view = next_view(&mut rx).await;
    assert_eq!(methods(&view), ["PUT"]);
    handle.shutdown().await;
}

#[tokio::test]
async fn manual_refresh_fetches_again() {
    let source = Scripted::new(vec![Ok(rows(&["GET"])), Ok(rows(&["GET", "POST"]))]);
    let calls = source.calls();
    let handle = Poller::new(source, Duration::from_secs(3600)).spawn();
    let mut rx = handle.view();

    assert_eq!(methods(&next_view(&mut rx).await), ["GET"]);
    handle.refresh();
    assert_eq!(methods(&next_view(&mut rx).await), ["GET", "POST"]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    handle.shutdown().await;
}

#[tokio::test]
async fn periodic_ticks_keep_fetching() {
    let source = Scripted::new(vec![Ok(rows(&["A"])), Ok(rows(&["A", "B"])), Ok(rows(&["A", "B", "C"]))]);
    let calls = source.calls();
    let handle = Poller::new(source, Duration::from_millis(10)).spawn();
    let mut rx = handle.view();

    // Views may be skipped between observations; only the latest matters.
    let mut latest = next_view(&mut rx).await;
    while latest.len() < 3 {
        latest = next_view(&mut rx).await;
    }
    assert_eq!(methods(&latest), ["A", "B", "C"]);
    assert!(calls.load(Ordering::SeqCst) >= 3);
    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_polling() {
    let source = Scripted::new(vec![Ok(rows(&["GET"]))]);
    let calls = source.calls();
    let handle = Poller::new(source, Duration::from_millis(5)).spawn();
    let mut rx = handle.view();
    next_view(&mut rx).await;

    timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("shutdown hung");
    let stopped_at = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), stopped_at);
}

#[tokio::test]
async fn dropping_handle_cancels_polling() {
    let source = Scripted::new(vec![Ok(rows(&["GET"]))]);
    let calls = source.calls();
    let handle = Poller::new(source, Duration::from_millis(5)).spawn();
    let mut rx = handle.view();
    next_view(&mut rx).await;

    drop(handle);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_drop = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_drop);
}

// ── Terminal front end ────────────────────────────────────────

#[tokio::test]
async fn terminal_prints_table_and_detail_by_row() {
    let entry = LogEntry::new("PATCH").with_ip(Some("9.9.9.9".into()));
    let handle = Poller::new(Scripted::new(vec![Ok(vec![entry])]), Duration::from_secs(3600)).spawn();
    let mut rx = handle.view();

    let (reader, mut writer) = tokio::io::duplex(64);
    let mut out = Vec::new();

    let screen = terminal::run(handle, BufReader::new(reader), &mut out);
    let typist = async move {
        next_view(&mut rx).await;
        writer.write_all(b"0\n5\nq\n").await.unwrap();
    };
    let (result, ()) = tokio::join!(screen, typist);
    result.unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Recent API Calls (1)"), "{text}");
    assert!(text.contains("Method:    PATCH"), "{text}");
    assert!(text.contains("IP:        9.9.9.9"), "{text}");
    assert!(text.contains("No row 5"), "{text}");
}

#[tokio::test]
async fn terminal_exits_on_end_of_input() {
    let handle = Poller::new(Scripted::new(vec![]), Duration::from_secs(3600)).spawn();
    let input: &[u8] = b"";
    let mut out = Vec::new();
    timeout(Duration::from_secs(5), terminal::run(handle, input, &mut out))
        .await
        .expect("terminal did not exit")
        .unwrap();
}
