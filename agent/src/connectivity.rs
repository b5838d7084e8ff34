//! Connectivity monitor.
//!
//! Mirrors the platform's online/offline signal and notifies subscribers on
//! every transition. The signal is advisory: a request can still fail while
//! "online", and nothing here pings the remote API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

/// Subscriber callback, called with the new state.
pub type Callback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    callbacks: DashMap<u64, Callback>,
}

/// Tracks whether the device is online.
///
/// Thread-safe and can be shared across tasks via `Arc`.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    subscribers: Arc<Subscribers>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
            subscribers: Arc::new(Subscribers::default()),
        }
    }

    pub fn new_shared(initially_online: bool) -> Arc<Self> {
        Arc::new(Self::new(initially_online))
    }

    /// Last reported state.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Feed a platform signal. Returns whether it changed the state.
    ///
    /// Subscribers are called once per transition, on the calling thread,
    /// after the new state is visible through [`is_online`](Self::is_online).
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }

        tracing::info!(online, "Connectivity changed");

        // Collect first so callbacks may subscribe or unsubscribe.
        let callbacks: Vec<Callback> = self
            .subscribers
            .callbacks
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for callback in callbacks {
            callback(online);
        }

        true
    }

    /// Register a callback for state transitions.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.subscribers.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.callbacks.insert(id, Arc::new(callback));

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.callbacks.len()
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("online", &self.is_online())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle to a registered callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.callbacks.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.callbacks.len())
            .finish()
    }
}
