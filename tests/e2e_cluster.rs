//! End-to-end tests against a live S3-compatible endpoint.
//!
//! These tests require a reachable endpoint and credentials.
//! Run with: cargo test --features e2e -- --ignored
//!
//! Requirements:
//! - HA_EVAL_ENDPOINT set to the endpoint URL (e.g. http://localhost:9000)
//! - AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY set

#![cfg(feature = "e2e")]

use ha_eval::cli::EndpointConfig;
use ha_eval::storage::{payload_for, S3Client, StorageClient};
use ha_eval::suite::cleanup_buckets;
use ha_eval::workload::{
    CancelToken, ClassifyPolicy, FaultWindow, WorkerConfig, WorkerPool, WorkloadKind,
};
use std::sync::Arc;
use std::time::Duration;

fn endpoint_from_env() -> EndpointConfig {
    let url = std::env::var("HA_EVAL_ENDPOINT").expect("HA_EVAL_ENDPOINT not set");
    EndpointConfig {
        url: Some(url),
        region: "us-east-1".to_string(),
        access_key_env: "AWS_ACCESS_KEY_ID".to_string(),
        secret_key_env: "AWS_SECRET_ACCESS_KEY".to_string(),
        force_path_style: true,
    }
}

fn client() -> S3Client {
    S3Client::new(&endpoint_from_env()).expect("failed to build S3 client")
}

#[tokio::test]
#[ignore = "requires a live S3 endpoint"]
async fn object_roundtrip() {
    let client = client();
    let bucket = format!("ha-eval-e2e-{}", uuid::Uuid::new_v4());

    client.create_bucket(&bucket).await.unwrap();

    let data = payload_for("e2e/obj-0", 1024);
    client.put_object(&bucket, "e2e/obj-0", data.clone()).await.unwrap();

    let read_back = client.get_object(&bucket, "e2e/obj-0").await.unwrap();
    assert_eq!(read_back, data);

    client.delete_object(&bucket, "e2e/obj-0").await.unwrap();
    client.delete_bucket(&bucket).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a live S3 endpoint"]
async fn bounded_workload_runs_clean() {
    let client: Arc<dyn StorageClient> = Arc::new(client());
    let bucket = format!("ha-eval-e2e-{}", uuid::Uuid::new_v4());
    client.create_bucket(&bucket).await.unwrap();

    let window = FaultWindow::new();
    let cancel = CancelToken::new();
    let cfg = WorkerConfig {
        iterations: Some(10),
        kind: WorkloadKind::Mixed,
        bucket: bucket.clone(),
        key_prefix: "e2e".to_string(),
        object_size: 4096,
        policy: ClassifyPolicy::TouchedAtAll,
    };

    let pool = WorkerPool::spawn(Arc::clone(&client), &window, &cancel, &cfg, 2);
    let results = pool.collect(Duration::from_secs(60)).await.unwrap();

    assert_eq!(results.merged.total(), 20);
    assert!(
        results.merged.clear_failures().is_empty(),
        "failures against a healthy endpoint: {:?}",
        results.merged.clear_failures()
    );

    cleanup_buckets(client.as_ref(), &bucket).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a live S3 endpoint"]
async fn cleanup_removes_prefixed_buckets() {
    let client = client();
    let prefix = format!("ha-eval-e2e-{}", uuid::Uuid::new_v4());

    for i in 0..2 {
        let bucket = format!("{}-{}", prefix, i);
        client.create_bucket(&bucket).await.unwrap();
        client
            .put_object(&bucket, "k", payload_for("k", 16))
            .await
            .unwrap();
    }

    let removed = cleanup_buckets(&client, &prefix).await.unwrap();
    assert_eq!(removed, 2);

    let leftover: Vec<_> = client
        .list_buckets()
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.starts_with(&prefix))
        .collect();
    assert!(leftover.is_empty());
}
