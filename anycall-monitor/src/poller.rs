use crate::client::LogSource;
use crate::view::LogView;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

/// Fetch-and-replace loop over a [`LogSource`].
///
/// Each successful fetch publishes a fresh [`LogView`]; a failed fetch is
/// logged and the previously published view stays in place. There is no
/// retry beyond the next scheduled tick.
pub struct Poller<S: LogSource + 'static> {
    source: Arc<S>,
    period: Duration,
    view_tx: watch::Sender<LogView>,
}

impl<S: LogSource + 'static> Poller<S> {
    pub fn new(source: S, period: Duration) -> Self {
        let (view_tx, _) = watch::channel(LogView::default());
        Self {
            source: Arc::new(source),
            period,
            view_tx,
        }
    }

    /// Latest published view.
    pub fn view(&self) -> watch::Receiver<LogView> {
        self.view_tx.subscribe()
    }

    /// Run one fetch. Returns whether the view was replaced.
    pub async fn poll_once(&self) -> bool {
        match self.source.fetch().await {
            Ok(rows) => {
                debug!(rows = rows.len(), "Request log refreshed");
                self.view_tx.send_replace(LogView::new(rows));
                true
            }
            Err(e) => {
                warn!(error = %e, "Error fetching request log; keeping previous data");
                false
            }
        }
    }

    /// Start polling on a background task. The first fetch happens
    /// immediately, then once per period.
    pub fn spawn(self) -> PollerHandle {
        let view_rx = self.view();
        let (refresh_tx, mut refresh_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        self.poll_once().await;
                    }
                    Some(()) = refresh_rx.recv() => {
                        self.poll_once().await;
                    }
                }
            }
            debug!("Poller stopped");
        });

        PollerHandle {
            view_rx,
            refresh_tx,
            shutdown_tx,
            task,
        }
    }
}

/// Control side of a running [`Poller`]. Dropping it cancels the task.
pub struct PollerHandle {
    view_rx: watch::Receiver<LogView>,
    refresh_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn view(&self) -> watch::Receiver<LogView> {
        self.view_rx.clone()
    }

    /// Ask for an immediate fetch. Requests made while one is already
    /// queued are coalesced.
    pub fn refresh(&self) {
        let _ = self.refresh_tx.try_send(());
    }

    /// Stop polling and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Poller task ended abnormally");
        }
    }
}
