//! Background refresh driver.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::{FsCache, RefreshSummary};

/// Capacity of the refresh event channel.
pub const REFRESH_CHANNEL_SIZE: usize = 16;

/// What started a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The refresh interval elapsed.
    Timer,
    /// Someone called [`RefreshHandle::request_refresh`].
    Request,
}

/// Result of one scheduled refresh.
#[derive(Debug, Clone)]
pub struct RefreshEvent {
    pub trigger: RefreshTrigger,
    /// Summary on success, error message on failure.
    pub outcome: Result<RefreshSummary, String>,
}

impl RefreshEvent {
    /// Check if the refresh published a new tree.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs [`FsCache::refresh`] on a timer and on request, one at a time.
///
/// Requests go through a single-slot [`Notify`]: any number of requests made
/// while a refresh is running collapse into one follow-up refresh. The timer
/// restarts after every refresh, whatever triggered it.
pub struct RefreshScheduler {
    cache: Arc<FsCache>,
    interval: Duration,
    events: broadcast::Sender<RefreshEvent>,
}

impl RefreshScheduler {
    /// Create a scheduler for `cache`.
    pub fn new(cache: Arc<FsCache>, interval: Duration) -> Self {
        let (events, _) = broadcast::channel(REFRESH_CHANNEL_SIZE);
        Self {
            cache,
            interval,
            events,
        }
    }

    /// Subscribe to refresh events before the driver starts.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    /// Start the driver on the current tokio runtime.
    pub fn spawn(self) -> RefreshHandle {
        let trigger = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let events = self.events.clone();

        let task = tokio::spawn(run(
            self.cache,
            self.interval,
            Arc::clone(&trigger),
            cancel.clone(),
            self.events,
        ));

        RefreshHandle {
            trigger,
            cancel,
            events,
            task,
        }
    }
}

/// Control handle for a running [`RefreshScheduler`].
pub struct RefreshHandle {
    trigger: Arc<Notify>,
    cancel: CancellationToken,
    events: broadcast::Sender<RefreshEvent>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Ask for a refresh as soon as possible. Never blocks.
    pub fn request_refresh(&self) {
        self.trigger.notify_one();
    }

    /// Subscribe to refresh events.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    /// Check if the driver has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the driver and wait for it to exit.
    ///
    /// A refresh already running completes, and is published if it succeeds,
    /// before this returns. No refresh starts after cancellation.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "refresh driver panicked");
        }
    }
}

async fn run(
    cache: Arc<FsCache>,
    interval: Duration,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
    events: broadcast::Sender<RefreshEvent>,
) {
    tracing::debug!(interval_ms = interval.as_millis() as u64, "refresh driver started");

    loop {
        let reason = tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = trigger.notified() => RefreshTrigger::Request,
            _ = tokio::time::sleep(interval) => RefreshTrigger::Timer,
        };

        // The build is not cancellable; wait for it even when shutting down
        // so nothing is published after `shutdown` returns.
        let worker = Arc::clone(&cache);
        let outcome = match tokio::task::spawn_blocking(move || worker.refresh()).await {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(err)) => {
                tracing::error!(trigger = ?reason, error = %err, "scheduled refresh failed");
                Err(err.to_string())
            }
            Err(err) => {
                tracing::error!(trigger = ?reason, error = %err, "refresh task panicked");
                Err(err.to_string())
            }
        };

        // No subscribers is fine.
        let _ = events.send(RefreshEvent {
            trigger: reason,
            outcome,
        });
    }

    tracing::debug!("refresh driver stopped");
}
