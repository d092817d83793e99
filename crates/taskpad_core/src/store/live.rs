//! Live query subscriptions.
//!
//! A [`LiveQuery`] pairs a store's change signal with a re-runnable read.
//! The first [`LiveQuery::next`] call delivers the current snapshot; every
//! later call waits for the next change signal and re-runs the read.
//! Bursts of mutations may coalesce into one re-run; the delivered snapshot
//! always reflects every mutation that happened before it was read.

use log::error;
use std::sync::Arc;
use tokio::sync::watch;

type Fetch<T, E> = Arc<dyn Fn() -> Result<T, E> + Send + Sync>;

/// Subscription that re-delivers a query result after every store change.
pub struct LiveQuery<T, E> {
    name: &'static str,
    changes: watch::Receiver<u64>,
    fetch: Fetch<T, E>,
    delivered: bool,
}

impl<T, E> LiveQuery<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(
        name: &'static str,
        changes: watch::Receiver<u64>,
        fetch: impl Fn() -> Result<T, E> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            changes,
            fetch: Arc::new(fetch),
            delivered: false,
        }
    }

    /// Query label used in log events.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits for and returns the next snapshot.
    ///
    /// The read runs on the blocking pool. Returns `None` once the owning
    /// store has been dropped or the read panicked; the subscription is over
    /// after that.
    pub async fn next(&mut self) -> Option<Result<T, E>> {
        if self.delivered {
            self.changes.changed().await.ok()?;
        }
        // Mark the current generation seen before reading so a mutation that
        // lands mid-read schedules another delivery.
        let _ = self.changes.borrow_and_update();
        self.delivered = true;

        let fetch = Arc::clone(&self.fetch);
        match tokio::task::spawn_blocking(move || fetch()).await {
            Ok(result) => Some(result),
            Err(err) => {
                error!(
                    "event=live_query module=store status=error query={} error_code=worker_failed error={err}",
                    self.name
                );
                None
            }
        }
    }
}
