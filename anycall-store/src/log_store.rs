use anycall_core::LogEntry;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Append-only, in-memory log of captured requests.
///
/// One store is created at process start and handed (by clone) to every
/// ingest and query handler. Entries keep insertion order, are never mutated
/// or removed, and live until the process exits.
///
/// A single coarse lock makes `append` and `list` atomic with respect to each
/// other: readers never see a half-appended entry and concurrent appends are
/// never lost. `list` returns a snapshot, so later appends do not show up in
/// a vector that was already handed out.
#[derive(Clone, Default)]
pub struct LogStore {
    entries: Arc<RwLock<Vec<Arc<LogEntry>>>>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entry` at the end of the log.
    pub fn append(&self, entry: LogEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push(Arc::new(entry));
        trace!(len = entries.len(), "Log entry appended");
    }

    /// Every entry held, in insertion order.
    pub fn list(&self) -> Vec<Arc<LogEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore").field("len", &self.len()).finish()
    }
}
