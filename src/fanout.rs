use axum::Router;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use crate::dispatcher::dispatch;
use crate::error::ApiError;
use crate::models::{DispatchResponse, FanOutRequest, FanOutResponse};

/// Dispatch every descriptor of a fan-out request concurrently.
///
/// One task per descriptor, at most `max_concurrency` in flight, all joined
/// before returning. Tasks share nothing but the router (and through it the
/// record store). `results[i]` always answers `requests[i]`; a task that dies
/// leaves a 500 entry at its index instead of failing the batch.
pub async fn fan_out(
    router: Router,
    request: FanOutRequest,
    max_concurrency: usize,
) -> FanOutResponse {
    let batch_id = Uuid::new_v4();
    let total = request.requests.len();
    let span = tracing::info_span!("fan_out", %batch_id, total);

    async move {
        tracing::info!("Fanning out {} requests (max concurrency {})", total, max_concurrency);

        let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, descriptor) in request.requests.into_iter().enumerate() {
            let router = router.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(
                async move {
                    // Held until the dispatch completes; the semaphore is never closed.
                    let _permit = semaphore.acquire_owned().await;
                    (index, dispatch(router, descriptor).await)
                }
                .in_current_span(),
            );
        }

        let mut slots: Vec<Option<DispatchResponse>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, response)) => slots[index] = Some(response),
                Err(err) => tracing::error!("Fan-out task failed: {}", err),
            }
        }

        let results: Vec<DispatchResponse> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    ApiError::Internal("request task did not complete".to_string())
                        .into_dispatch_response()
                })
            })
            .collect();

        let failed = results.iter().filter(|r| r.status_code >= 400).count();
        tracing::info!("Fan-out finished: {} succeeded, {} failed", total - failed, failed);

        FanOutResponse { results }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::test_app;
    use crate::models::{OperationDescriptor, Record, RequestBody};
    use crate::store::{InMemoryRecordStore, RecordStore};
    use anyhow::Result;
    use async_trait::async_trait;

    fn post_user(id: &str, name: &str) -> OperationDescriptor {
        let body = serde_json::json!({ "id": id, "name": name });
        OperationDescriptor::new("/user", "POST").with_body(RequestBody::Json(body))
    }

    /// Store that panics on `put` for one id and delegates everything else
    struct PanicOnPutStore {
        inner: InMemoryRecordStore,
        panic_id: &'static str,
    }

    #[async_trait]
    impl RecordStore for PanicOnPutStore {
        async fn put(&self, record: &Record) -> Result<()> {
            if record.id == self.panic_id {
                panic!("put of '{}' aborted", record.id);
            }
            self.inner.put(record).await
        }

        async fn scan(&self) -> Result<Vec<Record>> {
            self.inner.scan().await
        }

        async fn get(&self, id: &str) -> Result<Option<Record>> {
            self.inner.get(id).await
        }

        async fn health_check(&self) -> Result<()> {
            self.inner.health_check().await
        }
    }

    #[tokio::test]
    async fn test_fan_out_empty() {
        let app = test_app(Arc::new(InMemoryRecordStore::new()));

        let response = fan_out(app, FanOutRequest { requests: vec![] }, 4).await;
        assert!(response.results.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fan_out_preserves_order_and_writes_all() {
        let store = Arc::new(InMemoryRecordStore::new());
        let app = test_app(store.clone());

        let requests: Vec<OperationDescriptor> = (0..50)
            .map(|i| post_user(&format!("{:02}", i), &format!("user {}", i)))
            .collect();

        let response = fan_out(app, FanOutRequest { requests }, 8).await;

        assert_eq!(response.results.len(), 50);
        for (i, result) in response.results.iter().enumerate() {
            assert_eq!(result.status_code, 200);
            let record: Record = serde_json::from_str(&result.body).unwrap();
            assert_eq!(record.id, format!("{:02}", i));
        }
        assert_eq!(store.len().await, 50);
    }

    #[tokio::test]
    async fn test_fan_out_failures_are_independent() {
        let store = Arc::new(InMemoryRecordStore::new());
        let app = test_app(store.clone());

        let requests = vec![
            post_user("1", "John Doe"),
            OperationDescriptor::new("/user", "POST")
                .with_body(RequestBody::Text(r#"{"name":"no id"}"#.to_string())),
            OperationDescriptor::new("/nowhere", "GET"),
            OperationDescriptor::new("/user/{user_id}", "GET").with_path_parameter("user_id", "1"),
        ];

        let response = fan_out(app, FanOutRequest { requests }, 100).await;

        let statuses: Vec<u16> = response.results.iter().map(|r| r.status_code).collect();
        assert_eq!(statuses[0], 200);
        assert_eq!(statuses[1], 400);
        assert_eq!(statuses[2], 404);
        // The GET races the POST of the same id; either outcome is valid.
        assert!(statuses[3] == 200 || statuses[3] == 404);
        assert_eq!(store.get("1").await.unwrap().unwrap().name, "John Doe");
    }

    #[tokio::test]
    async fn test_fan_out_same_id_upserts_once() {
        let store = Arc::new(InMemoryRecordStore::new());
        let app = test_app(store.clone());

        let requests = (0..10).map(|i| post_user("same", &format!("writer {}", i))).collect();
        let response = fan_out(app, FanOutRequest { requests }, 3).await;

        assert!(response.results.iter().all(|r| r.status_code == 200));
        let records = store.scan().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].name.starts_with("writer "));
    }

    #[tokio::test]
    async fn test_fan_out_aborted_task_is_server_error_at_its_index() {
        let store = Arc::new(PanicOnPutStore {
            inner: InMemoryRecordStore::new(),
            panic_id: "boom",
        });
        let app = test_app(store.clone());

        let requests = vec![
            post_user("1", "John Doe"),
            post_user("boom", "never stored"),
            post_user("2", "Jane Doe"),
        ];

        let response = fan_out(app, FanOutRequest { requests }, 2).await;

        let statuses: Vec<u16> = response.results.iter().map(|r| r.status_code).collect();
        assert_eq!(statuses, vec![200, 500, 200]);
        assert!(response.results[1].body.contains("error"));
        assert_eq!(store.inner.len().await, 2);
        assert_eq!(store.inner.get("boom").await.unwrap(), None);
    }
}
