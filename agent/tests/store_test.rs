//! Integration tests for the local store: pending queue and dashboard cache.

use std::time::Duration;

use beneficios_agent::cache::DashboardCache;
use beneficios_agent::db::LocalStore;
use beneficios_agent::queue::PendingQueue;
use beneficios_engine::{OperationStatus, OperationType, SyncAction};
use serde::{Deserialize, Serialize};
use serde_json::json;

async fn store() -> LocalStore {
    LocalStore::open_in_memory().await.unwrap()
}

#[cfg(test)]
mod queue_tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_defaults() {
        let queue = PendingQueue::new(store().await);
        let data = json!({"pessoaId": 5, "programaId": 2});

        let id = queue.enqueue("solicitacao", data.clone()).await.unwrap();

        let op = queue.get(&id).await.unwrap().unwrap();
        assert_eq!(op.op_type, "solicitacao");
        assert_eq!(op.data, data);
        assert_eq!(op.status, OperationStatus::Pending);
        assert_eq!(op.retry_count, 0);
        assert!(op.last_error.is_none());
        assert!(op.created_at > 0);

        let history = queue.history(&id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, SyncAction::Created);
    }

    #[tokio::test]
    async fn test_list_filters_and_keeps_fifo() {
        let queue = PendingQueue::new(store().await);
        let a = queue.enqueue("solicitacao", json!({"n": 1})).await.unwrap();
        let b = queue.enqueue("hora_maquina", json!({"n": 2})).await.unwrap();
        let c = queue.enqueue("solicitacao", json!({"n": 3})).await.unwrap();
        queue.update_status(&b, OperationStatus::Syncing, None).await.unwrap();

        let pending: Vec<_> = queue
            .list_by_status(Some(OperationStatus::Pending))
            .await
            .unwrap()
            .into_iter()
            .map(|op| op.id)
            .collect();
        assert_eq!(pending, vec![a.clone(), c.clone()]);

        let all: Vec<_> = queue
            .list_by_status(None)
            .await
            .unwrap()
            .into_iter()
            .map(|op| op.id)
            .collect();
        assert_eq!(all, vec![a.clone(), b.clone(), c.clone()]);

        let horas = queue.list_by_type(OperationType::HoraMaquina).await.unwrap();
        assert_eq!(horas.len(), 1);
        assert_eq!(horas[0].id, b);
    }

    #[tokio::test]
    async fn test_failed_update_records_attempt() {
        let queue = PendingQueue::new(store().await);
        let id = queue.enqueue("solicitacao", json!({})).await.unwrap();

        queue.update_status(&id, OperationStatus::Syncing, None).await.unwrap();
        queue
            .update_status(&id, OperationStatus::Pending, Some("HTTP 503: indisponível"))
            .await
            .unwrap();

        let op = queue.get(&id).await.unwrap().unwrap();
        assert_eq!(op.retry_count, 1);
        assert_eq!(op.last_error.as_deref(), Some("HTTP 503: indisponível"));

        let history = queue.history(&id).await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.action, SyncAction::Failed);
        assert_eq!(last.error.as_deref(), Some("HTTP 503: indisponível"));
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let queue = PendingQueue::new(store().await);
        for _ in 0..3 {
            queue.enqueue("solicitacao", json!({})).await.unwrap();
        }
        assert_eq!(queue.count(OperationStatus::Pending).await.unwrap(), 3);
        assert_eq!(queue.count(OperationStatus::Failed).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_logs_synced() {
        let queue = PendingQueue::new(store().await);
        let id = queue.enqueue("hora_maquina", json!({})).await.unwrap();

        assert!(queue.remove(&id).await.unwrap());
        assert!(queue.get(&id).await.unwrap().is_none());

        let actions: Vec<_> = queue
            .history(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec![SyncAction::Created, SyncAction::Synced]);
    }

    #[tokio::test]
    async fn test_requeue_all_failed_resets_budget() {
        let queue = PendingQueue::new(store().await);
        let mut ids = Vec::new();
        for _ in 0..2 {
            let id = queue.enqueue("solicitacao", json!({})).await.unwrap();
            queue.update_status(&id, OperationStatus::Syncing, None).await.unwrap();
            queue
                .update_status(&id, OperationStatus::Failed, Some("rejected"))
                .await
                .unwrap();
            ids.push(id);
        }
        let untouched = queue.enqueue("solicitacao", json!({})).await.unwrap();

        assert_eq!(queue.requeue_all_failed().await.unwrap(), 2);

        for id in &ids {
            let op = queue.get(id).await.unwrap().unwrap();
            assert_eq!(op.status, OperationStatus::Pending);
            assert_eq!(op.retry_count, 0);
            assert!(op.last_error.is_none());
        }
        assert_eq!(queue.count(OperationStatus::Pending).await.unwrap(), 3);
        assert!(queue.get(&untouched).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_queue_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("beneficios-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let url = format!("sqlite://{}", dir.join("offline.db").display());

        let store = LocalStore::open(&url).await.unwrap();
        let id = PendingQueue::new(store.clone())
            .enqueue("solicitacao", json!({"pessoaId": 9}))
            .await
            .unwrap();
        store.close().await;

        let reopened = LocalStore::open(&url).await.unwrap();
        let op = PendingQueue::new(reopened.clone()).get(&id).await.unwrap().unwrap();
        assert_eq!(op.data, json!({"pessoaId": 9}));
        assert_eq!(reopened.schema_version().await.unwrap(), 1);
        reopened.close().await;

        std::fs::remove_dir_all(&dir).ok();
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Estatisticas {
        total: u32,
        aprovadas: u32,
    }

    #[tokio::test]
    async fn test_put_twice_keeps_one_entry() {
        let store = store().await;
        let cache = DashboardCache::new(store.clone());

        cache.put("X", &json!({"v": "A"})).await.unwrap();
        let first = cache.entry("X").await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put("X", &json!({"v": "B"})).await.unwrap();

        let entry = cache.entry("X").await.unwrap().unwrap();
        assert_eq!(entry.data, json!({"v": "B"}));
        assert!(entry.timestamp > first.timestamp);
        assert_eq!(
            beneficios_agent::db::cache::count_entries(store.pool(), "X")
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache = DashboardCache::new(store().await);
        let stats = Estatisticas {
            total: 120,
            aprovadas: 87,
        };

        cache.put("ESTATISTICAS_GERAIS", &stats).await.unwrap();

        let loaded: Option<Estatisticas> = cache.get("ESTATISTICAS_GERAIS").await.unwrap();
        assert_eq!(loaded, Some(stats));
        let missing: Option<Estatisticas> = cache.get("POR_STATUS").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_is_valid_judges_age() {
        let cache = DashboardCache::new(store().await);
        cache.put("POR_PROGRAMA", &json!([])).await.unwrap();

        assert!(cache
            .is_valid("POR_PROGRAMA", Duration::from_secs(60))
            .await
            .unwrap());

        let later = beneficios_agent::now_millis() + 120_000;
        assert!(!cache
            .is_valid_at("POR_PROGRAMA", Duration::from_secs(60), later)
            .await
            .unwrap());
        assert!(!cache.is_valid("AUSENTE", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let cache = DashboardCache::new(store().await);
        cache.put("POR_STATUS", &json!({})).await.unwrap();
        cache.put("POR_PROGRAMA", &json!({})).await.unwrap();

        assert_eq!(cache.keys().await.unwrap().len(), 2);
        assert_eq!(cache.clear().await.unwrap(), 2);
        assert!(cache.keys().await.unwrap().is_empty());
        assert!(cache.entry("POR_STATUS").await.unwrap().is_none());
    }
}
