//! Bucket-lifecycle workload: create buckets, fill them, read everything
//! back with checksum verification, then tear them down. Same window,
//! classification, and handoff contract as the object-stream workload, with
//! the bucket name as the record's target dimension.

use crate::storage::{content_digest, payload_for, StorageClient};
use crate::workload::{
    CancelToken, ClassifyPolicy, FaultWindow, OpKind, OperationRecord, Outcome, ResultBucket,
    WorkerPool,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketCrudConfig {
    /// Buckets each worker cycles through
    pub buckets: u32,
    pub objects_per_bucket: u32,
    pub object_size: usize,
    /// Bucket names are derived from this plus worker and cycle indices
    pub bucket_prefix: String,
    #[serde(default)]
    pub skip_put: bool,
    #[serde(default)]
    pub skip_get: bool,
    #[serde(default)]
    pub skip_delete: bool,
    #[serde(default)]
    pub policy: ClassifyPolicy,
}

impl BucketCrudConfig {
    fn bucket_name(&self, worker: usize, cycle: u32) -> String {
        format!("{}-w{}-{}", self.bucket_prefix, worker, cycle)
    }
}

/// Sample the window around one sub-operation and file the classified record
async fn attempt<F, Fut>(
    bucket: &mut ResultBucket,
    window: &FaultWindow,
    policy: ClassifyPolicy,
    op: OpKind,
    target: &str,
    f: F,
) where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Outcome>,
{
    let before = window.is_set();
    let outcome = f().await;
    let after = window.is_set();

    let state = policy.classify(before, after);
    if !outcome.is_ok() {
        warn!("{} {} failed ({:?} window): {:?}", op, target, state, outcome);
    }
    bucket.push(OperationRecord::new(op, target, outcome, state));
}

/// Run one bucket-CRUD worker to completion.
///
/// Cancellation is checked between buckets, not between sub-operations, so
/// a cycle that has created a bucket also gets the chance to delete it.
pub async fn run_bucket_crud(
    client: Arc<dyn StorageClient>,
    window: FaultWindow,
    cancel: CancelToken,
    cfg: BucketCrudConfig,
    worker: usize,
    tx: mpsc::Sender<ResultBucket>,
) {
    let mut results = ResultBucket::new();

    for cycle in 0..cfg.buckets {
        if cancel.is_cancelled() {
            debug!("crud worker {} cancelled after {} buckets", worker, cycle);
            break;
        }

        let name = cfg.bucket_name(worker, cycle);

        attempt(
            &mut results,
            &window,
            cfg.policy,
            OpKind::CreateBucket,
            &name,
            || async {
                match client.create_bucket(&name).await {
                    Ok(()) => Outcome::Ok,
                    Err(e) => Outcome::Failed { error: e.to_string() },
                }
            },
        )
        .await;

        if !cfg.skip_put {
            for obj in 0..cfg.objects_per_bucket {
                let key = format!("obj-{}", obj);
                attempt(
                    &mut results,
                    &window,
                    cfg.policy,
                    OpKind::PutObject,
                    &name,
                    || async {
                        let data = payload_for(&format!("{}/{}", name, key), cfg.object_size);
                        match client.put_object(&name, &key, data).await {
                            Ok(()) => Outcome::Ok,
                            Err(e) => Outcome::Failed { error: e.to_string() },
                        }
                    },
                )
                .await;
            }
        }

        if !cfg.skip_get {
            for obj in 0..cfg.objects_per_bucket {
                let key = format!("obj-{}", obj);
                attempt(
                    &mut results,
                    &window,
                    cfg.policy,
                    OpKind::GetObject,
                    &name,
                    || async {
                        match client.get_object(&name, &key).await {
                            Ok(data) => {
                                let expected = content_digest(&payload_for(
                                    &format!("{}/{}", name, key),
                                    cfg.object_size,
                                ));
                                let actual = content_digest(&data);
                                if expected == actual {
                                    Outcome::Ok
                                } else {
                                    Outcome::ChecksumMismatch { expected, actual }
                                }
                            }
                            Err(e) => Outcome::Failed { error: e.to_string() },
                        }
                    },
                )
                .await;
            }
        }

        if !cfg.skip_delete {
            if !cfg.skip_put {
                for obj in 0..cfg.objects_per_bucket {
                    let key = format!("obj-{}", obj);
                    attempt(
                        &mut results,
                        &window,
                        cfg.policy,
                        OpKind::DeleteObject,
                        &name,
                        || async {
                            match client.delete_object(&name, &key).await {
                                Ok(()) => Outcome::Ok,
                                Err(e) => Outcome::Failed { error: e.to_string() },
                            }
                        },
                    )
                    .await;
                }
            }

            attempt(
                &mut results,
                &window,
                cfg.policy,
                OpKind::DeleteBucket,
                &name,
                || async {
                    match client.delete_bucket(&name).await {
                        Ok(()) => Outcome::Ok,
                        Err(e) => Outcome::Failed { error: e.to_string() },
                    }
                },
            )
            .await;
        }
    }

    if tx.send(results).await.is_err() {
        warn!("crud worker {} result channel closed before handoff", worker);
    }
}

/// Start `workers` bucket-CRUD tasks sharing one result channel
pub fn spawn_crud_workers(
    client: Arc<dyn StorageClient>,
    window: &FaultWindow,
    cancel: &CancelToken,
    cfg: &BucketCrudConfig,
    workers: usize,
) -> WorkerPool {
    let (tx, rx) = mpsc::channel(workers.max(1));
    let mut handles = Vec::with_capacity(workers);

    for worker in 0..workers {
        handles.push(tokio::spawn(run_bucket_crud(
            Arc::clone(&client),
            window.clone(),
            cancel.clone(),
            cfg.clone(),
            worker,
            tx.clone(),
        )));
    }

    WorkerPool::from_parts(handles, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryClient;
    use std::time::Duration;

    fn config() -> BucketCrudConfig {
        BucketCrudConfig {
            buckets: 2,
            objects_per_bucket: 3,
            object_size: 32,
            bucket_prefix: "crud".to_string(),
            skip_put: false,
            skip_get: false,
            skip_delete: false,
            policy: ClassifyPolicy::TouchedAtAll,
        }
    }

    #[tokio::test]
    async fn test_full_cycle_is_clean() {
        let client = Arc::new(MemoryClient::new());
        let window = FaultWindow::new();
        let cancel = CancelToken::new();

        let pool = spawn_crud_workers(client, &window, &cancel, &config(), 2);
        let results = pool.collect(Duration::from_secs(5)).await.unwrap();

        // 2 workers x 2 buckets x (create + 3 put + 3 get + 3 delete + drop)
        assert_eq!(results.merged.total(), 44);
        assert!(results.merged.clear_failures().is_empty());
    }

    #[tokio::test]
    async fn test_skip_phases() {
        let client = Arc::new(MemoryClient::new());
        let window = FaultWindow::new();
        let cancel = CancelToken::new();
        let cfg = BucketCrudConfig {
            skip_get: true,
            skip_delete: true,
            ..config()
        };

        let pool = spawn_crud_workers(Arc::clone(&client) as Arc<dyn StorageClient>, &window, &cancel, &cfg, 1);
        let results = pool.collect(Duration::from_secs(5)).await.unwrap();

        // create + 3 puts per bucket, nothing torn down
        assert_eq!(results.merged.total(), 8);
        let remaining = client.list_objects("crud-w0-0", "").await.unwrap();
        assert_eq!(remaining.len(), 3);
    }

    #[tokio::test]
    async fn test_outage_during_cycle_lands_in_set_bucket() {
        let client = Arc::new(MemoryClient::new());
        let window = FaultWindow::new();
        let cancel = CancelToken::new();

        client.set_failing(true);
        window.set();

        let pool = spawn_crud_workers(Arc::clone(&client) as Arc<dyn StorageClient>, &window, &cancel, &config(), 1);
        let results = pool.collect(Duration::from_secs(5)).await.unwrap();

        assert!(results.merged.clear_failures().is_empty());
        assert!(!results.merged.set_failures().is_empty());
        assert!(results.merged.set_failures().len() <= results.merged.set_attempts());
    }
}
