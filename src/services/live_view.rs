//! Live snapshot of all visitors and visits for listing views.
//!
//! A background task re-reads both collections on a fixed interval and whenever
//! the store announces a committed change. Each refresh replaces the whole
//! snapshot. Stopping the view (explicitly or by dropping the handle) only
//! prevents further refreshes; a refresh already running is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::{
    sync::{broadcast::error::RecvError, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{error::AppResult, models::Snapshot, repository::RecordStore};

/// Read both collections once
pub async fn load_snapshot(store: &dyn RecordStore) -> AppResult<Snapshot> {
    let visitors = store.list_visitors().await?;
    let visits = store.list_visits().await?;
    Ok(Snapshot {
        visitors,
        visits,
        refreshed_at: Some(Utc::now()),
    })
}

/// Handle to a running live view
pub struct LiveView {
    snapshot: watch::Receiver<Arc<Snapshot>>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl LiveView {
    /// Start refreshing every `interval` and on every store change
    pub fn start(store: Arc<dyn RecordStore>, interval: Duration) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::default()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(refresh_loop(store, interval, snapshot_tx, shutdown_rx));

        Self {
            snapshot: snapshot_rx,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    /// Latest snapshot; empty until the first refresh completes
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    /// Watch snapshot replacements
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    /// Stop scheduling refreshes and wait for the task to wind down
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn refresh_loop(
    store: Arc<dyn RecordStore>,
    interval: Duration,
    snapshot: watch::Sender<Arc<Snapshot>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut changes = store.subscribe();
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!("Live view started ({:?} interval)", interval);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
            change = changes.recv() => match change {
                Ok(change) => tracing::trace!("Live view refresh on {:?}", change),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Live view skipped {} change notifications", skipped)
                }
                Err(RecvError::Closed) => break,
            },
        }

        // Not raced against shutdown: an in-flight refresh always completes
        match load_snapshot(store.as_ref()).await {
            Ok(fresh) => {
                if snapshot.send(Arc::new(fresh)).is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("Live view refresh failed: {}", e),
        }

        if *shutdown.borrow() {
            break;
        }
    }

    tracing::debug!("Live view stopped");
}
