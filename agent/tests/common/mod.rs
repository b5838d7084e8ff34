//! Shared fixtures for the agent integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use beneficios_agent::connectivity::ConnectivityMonitor;
use beneficios_agent::db::LocalStore;
use beneficios_agent::error::TransportError;
use beneficios_agent::queue::PendingQueue;
use beneficios_agent::sync::{DrainSettings, SyncManager};
use beneficios_agent::transport::SyncTransport;
use beneficios_engine::RetryPolicy;
use serde_json::Value;
use tokio::sync::{Notify, Semaphore};

/// How the mock answers one POST.
#[derive(Debug, Clone)]
pub enum Reply {
    Accept,
    Reject(u16),
    NetworkDown,
    /// Never answers; only the caller's timeout ends the request
    Hang,
}

/// Scripted in-memory stand-in for the remote API.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Option<Reply>>,
    posts: Mutex<Vec<(String, Value)>>,
    reports: Mutex<HashMap<String, Value>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    started: Notify,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replies for the next POSTs, in order.
    pub fn script(&self, replies: impl IntoIterator<Item = Reply>) {
        self.script.lock().unwrap().extend(replies);
    }

    /// Reply used once the script is exhausted (default: accept).
    pub fn always(&self, reply: Reply) {
        *self.fallback.lock().unwrap() = Some(reply);
    }

    /// Serve `data` for GET `path`.
    pub fn serve_report(&self, path: &str, data: Value) {
        self.reports.lock().unwrap().insert(path.to_string(), data);
    }

    pub fn drop_reports(&self) {
        self.reports.lock().unwrap().clear();
    }

    /// Hold every POST until a permit is released with [`release`](Self::release).
    pub fn hold_posts(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Resolves once a POST has reached the mock.
    pub async fn wait_for_post(&self) {
        self.started.notified().await;
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

impl SyncTransport for MockTransport {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<(), TransportError> {
        self.posts
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body.clone()));
        self.started.notify_one();

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let scripted = self.script.lock().unwrap().pop_front();
        let reply = scripted
            .or_else(|| self.fallback.lock().unwrap().clone())
            .unwrap_or(Reply::Accept);

        match reply {
            Reply::Accept => Ok(()),
            Reply::Reject(status) => Err(TransportError::Status {
                status,
                body: format!("mock rejected with {}", status),
            }),
            Reply::NetworkDown => Err(TransportError::Network("connection refused".into())),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.reports
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::Network("connection refused".into()))
    }
}

/// Drain timings short enough for tests.
pub fn fast_drain() -> DrainSettings {
    DrainSettings {
        request_timeout: Duration::from_secs(1),
        operation_delay: Duration::from_millis(1),
    }
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub queue: PendingQueue,
    pub manager: Arc<SyncManager<MockTransport>>,
}

pub async fn harness(online: bool) -> Harness {
    harness_with_policy(online, RetryPolicy::default()).await
}

pub async fn harness_with_policy(online: bool, policy: RetryPolicy) -> Harness {
    let store = LocalStore::open_in_memory().await.unwrap();
    let transport = MockTransport::new();
    let connectivity = ConnectivityMonitor::new_shared(online);
    let queue = PendingQueue::new(store);
    let manager = Arc::new(SyncManager::new(
        queue.clone(),
        transport.clone(),
        connectivity.clone(),
        policy,
        fast_drain(),
    ));

    Harness {
        transport,
        connectivity,
        queue,
        manager,
    }
}

/// Poll `check` until it holds or `within` elapses.
pub async fn eventually<F, Fut>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
