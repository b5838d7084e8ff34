//! Automatic sync triggers.
//!
//! Three triggers run a drain pass:
//! - once at startup, if online
//! - after a short debounce on every offline -> online transition
//! - periodically while online
//!
//! Passes never overlap; the manager's in-progress guard turns a trigger that
//! fires during a pass into a no-op.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SyncManager;
use crate::config::Config;
use crate::connectivity::Subscription;
use crate::transport::SyncTransport;

#[derive(Debug, Clone, Copy)]
pub struct AutoSyncSettings {
    pub sync_interval: Duration,
    pub reconnect_debounce: Duration,
}

impl Default for AutoSyncSettings {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(5 * 60),
            reconnect_debounce: Duration::from_secs(1),
        }
    }
}

impl From<&Config> for AutoSyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            sync_interval: config.sync_interval,
            reconnect_debounce: config.reconnect_debounce,
        }
    }
}

/// Running background triggers. Dropping it aborts them; [`stop`](Self::stop)
/// also waits for the tasks to finish.
#[derive(Debug)]
pub struct AutoSync {
    tasks: Vec<JoinHandle<()>>,
    subscription: Option<Subscription>,
}

impl AutoSync {
    /// Spawn the triggers. Must be called inside a tokio runtime.
    pub fn start<T: SyncTransport>(
        manager: Arc<SyncManager<T>>,
        settings: AutoSyncSettings,
    ) -> Self {
        let (reconnect_tx, reconnect_rx) = mpsc::unbounded_channel();
        let subscription = manager.connectivity().on_change(move |online| {
            if online {
                let _ = reconnect_tx.send(());
            }
        });

        let tasks = vec![
            tokio::spawn(startup_pass(manager.clone())),
            tokio::spawn(reconnect_loop(
                manager.clone(),
                reconnect_rx,
                settings.reconnect_debounce,
            )),
            tokio::spawn(periodic_loop(manager, settings.sync_interval)),
        ];

        tracing::info!(
            interval = ?settings.sync_interval,
            debounce = ?settings.reconnect_debounce,
            "Automatic sync started"
        );

        Self {
            tasks,
            subscription: Some(subscription),
        }
    }

    /// Cancel every trigger and wait for the tasks to wind down.
    pub async fn stop(mut self) {
        self.subscription.take();
        let tasks = std::mem::take(&mut self.tasks);
        for task in &tasks {
            task.abort();
        }
        futures::future::join_all(tasks).await;
        tracing::info!("Automatic sync stopped");
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn run_pass<T: SyncTransport>(manager: &SyncManager<T>, trigger: &'static str) {
    if !manager.connectivity().is_online() {
        return;
    }

    tracing::debug!(trigger, "Triggering sync pass");
    if let Err(e) = manager.sync_pending_operations().await {
        tracing::error!(trigger, error = %e, "Sync pass failed");
    }
}

async fn startup_pass<T: SyncTransport>(manager: Arc<SyncManager<T>>) {
    run_pass(&manager, "startup").await;
}

async fn reconnect_loop<T: SyncTransport>(
    manager: Arc<SyncManager<T>>,
    mut reconnects: mpsc::UnboundedReceiver<()>,
    debounce: Duration,
) {
    while reconnects.recv().await.is_some() {
        tokio::time::sleep(debounce).await;
        // Flapping during the debounce collapses into one pass.
        while reconnects.try_recv().is_ok() {}
        run_pass(&manager, "reconnect").await;
    }
}

async fn periodic_loop<T: SyncTransport>(manager: Arc<SyncManager<T>>, every: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        run_pass(&manager, "periodic").await;
    }
}
