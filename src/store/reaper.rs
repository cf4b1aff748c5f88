use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use tracing::warn;

use crate::core::types::RowId;
use crate::store::table::{Inner, Table};

const TICK: Duration = Duration::from_secs(1);

pub(crate) struct ReaperHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

fn reap_once(inner: &Inner) {
    let now = Utc::now();
    let expired: Vec<RowId> = {
        let state = inner.state.read();
        state
            .expire_at
            .iter()
            .filter(|(_, at)| **at < now)
            .map(|(id, _)| *id)
            .collect()
    };
    // Each removal takes the write lock on its own, so readers interleave
    // and every row disappears from all maps atomically.
    for id in expired {
        inner.state.write().remove(id);
    }
}

impl Table {
    /// Spawn the background reaper. Every second it collects the ids whose
    /// expiry has passed under shared access, releases, then removes them
    /// one by one under exclusive access. At most one reaper per table; a
    /// second start is refused.
    pub fn start_reaper(&self) {
        let mut guard = self.inner.reaper.lock();
        if guard.is_some() {
            warn!("reaper already running");
            return;
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let inner = Arc::clone(&self.inner);
        let thread = thread::spawn(move || loop {
            reap_once(&inner);
            match stop_rx.recv_timeout(TICK) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        });

        *guard = Some(ReaperHandle { stop_tx, thread });
    }

    /// Stop the reaper and wait for it to exit; responds within one tick.
    /// Safe to call when no reaper is running.
    pub fn stop_reaper(&self) {
        let handle = self.inner.reaper.lock().take();
        if let Some(handle) = handle {
            let _ = handle.stop_tx.try_send(());
            let _ = handle.thread.join();
        }
    }

    pub(crate) fn reaper_running(&self) -> bool {
        self.inner.reaper.lock().is_some()
    }
}
