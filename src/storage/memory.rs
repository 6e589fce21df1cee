//! In-memory storage client for testing the harness itself.
//!
//! Supports scripted misbehavior so the coordination pattern can be
//! exercised without a real cluster: a failure switch that simulates an
//! outage, a read-corruption toggle for the checksum-verification path, and
//! a per-operation delay for handoff-timeout tests.

use crate::storage::{ClientError, ClientResult, StorageClient};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

type Buckets = HashMap<String, HashMap<String, Bytes>>;

#[derive(Clone, Default)]
pub struct MemoryClient {
    buckets: Arc<Mutex<Buckets>>,
    failing: Arc<AtomicBool>,
    corrupt_reads: Arc<AtomicBool>,
    delay_ms: Arc<AtomicU64>,
    pace: Option<Arc<Semaphore>>,
    completed: Arc<AtomicU64>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paced variant: every operation waits for one permit before running,
    /// giving a test full control over when each workload unit executes.
    pub fn paced() -> (Self, Pacer) {
        let sem = Arc::new(Semaphore::new(0));
        let client = Self {
            pace: Some(Arc::clone(&sem)),
            ..Self::default()
        };
        let pacer = Pacer {
            sem,
            completed: Arc::clone(&client.completed),
        };
        (client, pacer)
    }

    /// While set, every operation fails with a backend error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// While set, reads return a corrupted body (first byte flipped)
    pub fn set_corrupt_reads(&self, corrupt: bool) {
        self.corrupt_reads.store(corrupt, Ordering::Relaxed);
    }

    /// Delay applied to every operation
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn completed_ops(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    async fn enter(&self) -> ClientResult<()> {
        if let Some(pace) = &self.pace {
            let permit = pace
                .acquire()
                .await
                .map_err(|_| ClientError::Backend("pacer closed".to_string()))?;
            permit.forget();
        }

        let delay = self.delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.failing.load(Ordering::Relaxed) {
            self.completed.fetch_add(1, Ordering::Relaxed);
            return Err(ClientError::Backend("injected outage".to_string()));
        }
        Ok(())
    }

    fn done(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Test-side handle that releases paced operations in controlled steps
pub struct Pacer {
    sem: Arc<Semaphore>,
    completed: Arc<AtomicU64>,
}

impl Pacer {
    /// Allow `n` more operations to run and wait until they have completed
    pub async fn step(&self, n: u64) {
        let target = self.completed.load(Ordering::Relaxed) + n;
        self.sem.add_permits(n as usize);
        while self.completed.load(Ordering::Relaxed) < target {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Allow operations to run freely from now on
    pub fn release(&self) {
        self.sem.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl StorageClient for MemoryClient {
    async fn create_bucket(&self, bucket: &str) -> ClientResult<()> {
        self.enter().await?;
        let mut buckets = self.buckets.lock().await;
        let result = if buckets.contains_key(bucket) {
            Err(ClientError::AlreadyExists(bucket.to_string()))
        } else {
            buckets.insert(bucket.to_string(), HashMap::new());
            Ok(())
        };
        self.done();
        result
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> ClientResult<()> {
        self.enter().await?;
        let mut buckets = self.buckets.lock().await;
        let result = match buckets.get_mut(bucket) {
            Some(objects) => {
                objects.insert(key.to_string(), data);
                Ok(())
            }
            None => Err(ClientError::NotFound(bucket.to_string())),
        };
        self.done();
        result
    }

    async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Bytes> {
        self.enter().await?;
        let buckets = self.buckets.lock().await;
        let result = match buckets.get(bucket) {
            Some(objects) => match objects.get(key) {
                Some(data) => {
                    if self.corrupt_reads.load(Ordering::Relaxed) && !data.is_empty() {
                        let mut corrupted = data.to_vec();
                        corrupted[0] ^= 0xff;
                        Ok(Bytes::from(corrupted))
                    } else {
                        Ok(data.clone())
                    }
                }
                None => Err(ClientError::NotFound(format!("{}/{}", bucket, key))),
            },
            None => Err(ClientError::NotFound(bucket.to_string())),
        };
        self.done();
        result
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()> {
        self.enter().await?;
        let mut buckets = self.buckets.lock().await;
        // S3 semantics: deleting a missing key succeeds
        let result = match buckets.get_mut(bucket) {
            Some(objects) => {
                objects.remove(key);
                Ok(())
            }
            None => Err(ClientError::NotFound(bucket.to_string())),
        };
        self.done();
        result
    }

    async fn delete_bucket(&self, bucket: &str) -> ClientResult<()> {
        self.enter().await?;
        let mut buckets = self.buckets.lock().await;
        let result = match buckets.get(bucket) {
            Some(objects) if !objects.is_empty() => Err(ClientError::NotEmpty(bucket.to_string())),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
            None => Err(ClientError::NotFound(bucket.to_string())),
        };
        self.done();
        result
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> ClientResult<Vec<String>> {
        self.enter().await?;
        let buckets = self.buckets.lock().await;
        let result = match buckets.get(bucket) {
            Some(objects) => {
                let mut keys: Vec<String> = objects
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect();
                keys.sort();
                Ok(keys)
            }
            None => Err(ClientError::NotFound(bucket.to_string())),
        };
        self.done();
        result
    }

    async fn list_buckets(&self) -> ClientResult<Vec<String>> {
        self.enter().await?;
        let buckets = self.buckets.lock().await;
        let mut names: Vec<String> = buckets.keys().cloned().collect();
        names.sort();
        self.done();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let client = MemoryClient::new();
        client.create_bucket("b").await.unwrap();

        let data = Bytes::from("Hello, World!");
        client.put_object("b", "k", data.clone()).await.unwrap();

        let retrieved = client.get_object("b", "k").await.unwrap();
        assert_eq!(data, retrieved);
    }

    #[tokio::test]
    async fn test_create_bucket_twice_fails() {
        let client = MemoryClient::new();
        client.create_bucket("b").await.unwrap();

        let err = client.create_bucket("b").await.unwrap_err();
        assert!(matches!(err, ClientError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_object_succeeds() {
        let client = MemoryClient::new();
        client.create_bucket("b").await.unwrap();
        client.delete_object("b", "missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_nonempty_bucket_fails() {
        let client = MemoryClient::new();
        client.create_bucket("b").await.unwrap();
        client.put_object("b", "k", Bytes::from("x")).await.unwrap();

        let err = client.delete_bucket("b").await.unwrap_err();
        assert!(matches!(err, ClientError::NotEmpty(_)));

        client.delete_object("b", "k").await.unwrap();
        client.delete_bucket("b").await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_switch() {
        let client = MemoryClient::new();
        client.create_bucket("b").await.unwrap();

        client.set_failing(true);
        let err = client.create_bucket("c").await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));

        client.set_failing(false);
        client.create_bucket("c").await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_reads() {
        let client = MemoryClient::new();
        client.create_bucket("b").await.unwrap();
        client.put_object("b", "k", Bytes::from("data")).await.unwrap();

        client.set_corrupt_reads(true);
        let corrupted = client.get_object("b", "k").await.unwrap();
        assert_ne!(corrupted, Bytes::from("data"));
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let client = MemoryClient::new();
        client.create_bucket("b").await.unwrap();
        client.put_object("b", "logs/1", Bytes::from("a")).await.unwrap();
        client.put_object("b", "logs/2", Bytes::from("b")).await.unwrap();
        client.put_object("b", "data/1", Bytes::from("c")).await.unwrap();

        let keys = client.list_objects("b", "logs/").await.unwrap();
        assert_eq!(keys, vec!["logs/1".to_string(), "logs/2".to_string()]);
    }

    #[tokio::test]
    async fn test_pacer_steps() {
        let (client, pacer) = MemoryClient::paced();

        let c = client.clone();
        let task = tokio::spawn(async move {
            c.create_bucket("b1").await.unwrap();
            c.create_bucket("b2").await.unwrap();
        });

        pacer.step(1).await;
        assert_eq!(client.completed_ops(), 1);

        pacer.step(1).await;
        assert_eq!(client.completed_ops(), 2);

        task.await.unwrap();
    }
}
