use crate::storage::{content_digest, payload_for, StorageClient};
use crate::workload::{
    CancelToken, ClassifyPolicy, FaultWindow, OpKind, OperationRecord, Outcome, ResultBucket,
};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Shape of the operation stream a background worker issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    #[default]
    WriteOnly,
    ReadOnly,
    /// Cycles put, get-verify, delete
    Mixed,
    DeleteOnly,
}

/// Per-worker configuration. Everything here is passed by value into the
/// worker task; workers share nothing mutable but the fault window and the
/// cancel token.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of iterations, or None to run until cancelled
    pub iterations: Option<u32>,
    pub kind: WorkloadKind,
    /// Bucket all operations target
    pub bucket: String,
    /// Key namespace; the worker index and iteration number are appended
    pub key_prefix: String,
    pub object_size: usize,
    pub policy: ClassifyPolicy,
}

impl WorkerConfig {
    fn key_for(&self, worker: usize, iteration: u32) -> String {
        format!("{}/w{}/obj-{}", self.key_prefix, worker, iteration)
    }
}

/// Run one background worker to completion.
///
/// Each iteration samples the fault window, attempts one workload unit,
/// samples the window again, and files the classified record. Operation
/// failures are recorded and swallowed; nothing aborts the loop except the
/// iteration count or the cancel token, both checked between iterations.
/// The accumulated bucket is published exactly once, on loop exit.
pub async fn run_worker(
    client: Arc<dyn StorageClient>,
    window: FaultWindow,
    cancel: CancelToken,
    cfg: WorkerConfig,
    worker: usize,
    tx: mpsc::Sender<ResultBucket>,
) {
    let mut bucket = ResultBucket::new();
    let mut iteration = 0u32;

    loop {
        if cancel.is_cancelled() {
            debug!("worker {} cancelled after {} iterations", worker, iteration);
            break;
        }
        if let Some(n) = cfg.iterations {
            if iteration >= n {
                break;
            }
        }

        let before = window.is_set();
        let (op, target, outcome) = perform_unit(client.as_ref(), &cfg, worker, iteration).await;
        let after = window.is_set();

        let state = cfg.policy.classify(before, after);
        if !outcome.is_ok() {
            warn!(
                "worker {} {} {} failed ({:?} window): {:?}",
                worker, op, target, state, outcome
            );
        }
        bucket.push(OperationRecord::new(op, target, outcome, state));

        iteration += 1;
    }

    // Single publication; a dropped receiver means the controller already
    // gave up on this run.
    if tx.send(bucket).await.is_err() {
        warn!("worker {} result channel closed before handoff", worker);
    }
}

async fn perform_unit(
    client: &dyn StorageClient,
    cfg: &WorkerConfig,
    worker: usize,
    iteration: u32,
) -> (OpKind, String, Outcome) {
    let key = cfg.key_for(worker, iteration);
    let target = format!("{}/{}", cfg.bucket, key);

    let op = match cfg.kind {
        WorkloadKind::WriteOnly => OpKind::PutObject,
        WorkloadKind::ReadOnly => OpKind::GetObject,
        WorkloadKind::DeleteOnly => OpKind::DeleteObject,
        WorkloadKind::Mixed => match iteration % 3 {
            0 => OpKind::PutObject,
            1 => OpKind::GetObject,
            _ => OpKind::DeleteObject,
        },
    };

    // Mixed reads and deletes revisit the key written in the same cycle
    let key = match (cfg.kind, op) {
        (WorkloadKind::Mixed, OpKind::GetObject) => cfg.key_for(worker, iteration - 1),
        (WorkloadKind::Mixed, OpKind::DeleteObject) => cfg.key_for(worker, iteration - 2),
        _ => key,
    };

    let outcome = match op {
        OpKind::PutObject => {
            let data = payload_for(&key, cfg.object_size);
            match client.put_object(&cfg.bucket, &key, data).await {
                Ok(()) => Outcome::Ok,
                Err(e) => Outcome::Failed { error: e.to_string() },
            }
        }
        OpKind::GetObject => match client.get_object(&cfg.bucket, &key).await {
            Ok(data) => {
                let expected = content_digest(&payload_for(&key, cfg.object_size));
                let actual = content_digest(&data);
                if expected == actual {
                    Outcome::Ok
                } else {
                    Outcome::ChecksumMismatch { expected, actual }
                }
            }
            Err(e) => Outcome::Failed { error: e.to_string() },
        },
        OpKind::DeleteObject => match client.delete_object(&cfg.bucket, &key).await {
            Ok(()) => Outcome::Ok,
            Err(e) => Outcome::Failed { error: e.to_string() },
        },
        // Bucket-level operations belong to the CRUD workload variant
        OpKind::CreateBucket | OpKind::DeleteBucket => unreachable!(),
    };

    (op, target, outcome)
}

/// Pre-create the objects a read-only workload will fetch
pub async fn seed_objects(
    client: &dyn StorageClient,
    cfg: &WorkerConfig,
    workers: usize,
) -> Result<()> {
    let count = match cfg.iterations {
        Some(n) => n,
        None => bail!("seeding requires a bounded iteration count"),
    };

    for worker in 0..workers {
        for iteration in 0..count {
            let key = cfg.key_for(worker, iteration);
            let data = payload_for(&key, cfg.object_size);
            client
                .put_object(&cfg.bucket, &key, data)
                .await
                .map_err(|e| anyhow::anyhow!("seeding {} failed: {}", key, e))?;
        }
    }
    Ok(())
}

/// Results retrieved from a pool after all workers have published
#[derive(Debug)]
pub struct CollectedResults {
    /// All records across workers, merged
    pub merged: ResultBucket,
    /// One bucket per worker, in publication order
    pub per_worker: Vec<ResultBucket>,
}

/// Owns the background worker tasks and the result channel.
///
/// The controller must `collect` before looking at any records; the channel
/// receive plus join is the only synchronization boundary between worker
/// memory and controller memory.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    rx: mpsc::Receiver<ResultBucket>,
}

impl WorkerPool {
    pub(crate) fn from_parts(handles: Vec<JoinHandle<()>>, rx: mpsc::Receiver<ResultBucket>) -> Self {
        Self { handles, rx }
    }

    /// Start `workers` background tasks running the same workload shape
    pub fn spawn(
        client: Arc<dyn StorageClient>,
        window: &FaultWindow,
        cancel: &CancelToken,
        cfg: &WorkerConfig,
        workers: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(workers.max(1));
        let mut handles = Vec::with_capacity(workers);

        for worker in 0..workers {
            let handle = tokio::spawn(run_worker(
                Arc::clone(&client),
                window.clone(),
                cancel.clone(),
                cfg.clone(),
                worker,
                tx.clone(),
            ));
            handles.push(handle);
        }

        Self { handles, rx }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Receive every worker's bucket, then join the tasks.
    ///
    /// Each receive is bounded by `handoff_timeout`; a worker that never
    /// publishes (crashed or wedged on an in-flight call) surfaces here as
    /// an error, which the controller reports as an infrastructure failure.
    pub async fn collect(mut self, handoff_timeout: Duration) -> Result<CollectedResults> {
        let workers = self.handles.len();
        let mut per_worker = Vec::with_capacity(workers);

        for received in 0..workers {
            match timeout(handoff_timeout, self.rx.recv()).await {
                Ok(Some(bucket)) => per_worker.push(bucket),
                Ok(None) => bail!(
                    "result channel closed after {} of {} handoffs",
                    received,
                    workers
                ),
                Err(_) => bail!(
                    "handoff timed out after {:?}: received {} of {} worker results",
                    handoff_timeout,
                    received,
                    workers
                ),
            }
        }

        // Workers publish immediately before returning, so joins complete
        // promptly once every bucket has arrived.
        for (worker, handle) in self.handles.into_iter().enumerate() {
            match timeout(handoff_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => bail!("worker {} task failed: {}", worker, e),
                Err(_) => bail!("worker {} did not terminate after publishing", worker),
            }
        }

        let mut merged = ResultBucket::new();
        for bucket in &per_worker {
            merged.merge(bucket.clone());
        }

        Ok(CollectedResults { merged, per_worker })
    }
}
