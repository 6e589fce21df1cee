use crate::cli::{FaultConfig, ScenarioConfig, SuiteConfig, WorkloadConfig};
use crate::fault::{FaultInjector, Noop, PodKill};
use crate::storage::{ClientError, S3Client, StorageClient};
use crate::suite::{ScenarioResult, SuiteResults};
use crate::workload::{
    seed_objects, spawn_crud_workers, CancelToken, FaultWindow, WorkerConfig, WorkerPool,
    WorkloadKind,
};
use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

/// Orchestrates the scenario runs.
///
/// Scenarios run sequentially; each one gets a fresh window, cancel token,
/// and worker pool, so a wedged scenario cannot leak state into the next.
pub struct SuiteRunner {
    config: SuiteConfig,
    results: Arc<Mutex<SuiteResults>>,
}

impl SuiteRunner {
    pub fn new(config: SuiteConfig) -> Self {
        let suite_id = Uuid::new_v4().to_string();
        let results = Arc::new(Mutex::new(SuiteResults::new(&config.name, &suite_id)));

        Self { config, results }
    }

    /// Run the suite against the configured S3 endpoint
    pub async fn run(&self, only: Option<&str>) -> Result<SuiteResults> {
        let client: Arc<dyn StorageClient> = Arc::new(S3Client::new(&self.config.endpoint)?);
        self.run_with_client(client, only).await
    }

    /// Run the suite against an already-constructed client
    pub async fn run_with_client(
        &self,
        client: Arc<dyn StorageClient>,
        only: Option<&str>,
    ) -> Result<SuiteResults> {
        let suite_id = {
            let results = self.results.lock().await;
            results.suite_id.clone()
        };

        info!("Starting suite: {} (ID: {})", self.config.name, suite_id);

        for scenario in &self.config.scenarios {
            if let Some(id) = only {
                if scenario.id != id {
                    continue;
                }
            }

            let result = self.run_scenario(Arc::clone(&client), scenario).await;
            info!("Scenario {}: {:?}", scenario.id, result.verdict);

            let mut results = self.results.lock().await;
            results.add_scenario(result);
        }

        if self.config.settings.cleanup_on_complete {
            for scenario in &self.config.scenarios {
                if let WorkloadConfig::BucketCrud { crud, .. } = &scenario.workload {
                    if let Err(e) = cleanup_buckets(client.as_ref(), &crud.bucket_prefix).await {
                        warn!("Cleanup of '{}' buckets failed: {}", crud.bucket_prefix, e);
                    }
                }
            }
        }

        let mut final_results = self.results.lock().await;
        final_results.finalize();

        Ok(final_results.clone())
    }

    /// Get the current results
    pub async fn results(&self) -> SuiteResults {
        self.results.lock().await.clone()
    }

    /// Save results to the output directory
    pub async fn save_results(&self, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;

        let results = self.results.lock().await;
        results.save_json(&output_dir.join("results.json"))?;
        std::fs::write(output_dir.join("report.md"), results.generate_report())?;

        info!("Results saved to {:?}", output_dir);
        Ok(())
    }

    async fn run_scenario(
        &self,
        client: Arc<dyn StorageClient>,
        scenario: &ScenarioConfig,
    ) -> ScenarioResult {
        let injector = match build_injector(&scenario.fault).await {
            Ok(injector) => injector,
            Err(e) => {
                let mut result = ScenarioResult::new(&scenario.id, "unavailable", 0);
                result.fail_with_error(&format!("fault injector setup failed: {}", e));
                return result;
            }
        };

        let workers = scenario.workload.workers();
        let mut result = ScenarioResult::new(&scenario.id, &injector.describe(), workers);

        info!(
            "Scenario {}: {} workers, fault: {}",
            scenario.id,
            workers,
            injector.describe()
        );

        let window = FaultWindow::new();
        let cancel = CancelToken::new();

        let pool =
            match spawn_workload(Arc::clone(&client), &window, &cancel, &scenario.workload).await {
                Ok(pool) => pool,
                Err(e) => {
                    result.fail_with_error(&format!("workload setup failed: {}", e));
                    return result;
                }
            };

        if scenario.warmup_secs > 0 {
            sleep(Duration::from_secs(scenario.warmup_secs)).await;
        }

        // Window open strictly covers injection through confirmed recovery.
        // A harness error here still falls through to collection so the
        // workers get drained rather than abandoned.
        let mut harness_error = None;
        if !matches!(scenario.fault, FaultConfig::None) {
            window.set();
            info!("Fault window open");

            match injector.inject().await {
                Ok(()) => {
                    let recovery = Duration::from_secs(scenario.recovery_timeout_secs);
                    if let Err(e) = injector.confirm_recovered(recovery).await {
                        harness_error = Some(format!("recovery not confirmed: {}", e));
                    }
                }
                Err(e) => harness_error = Some(format!("fault injection failed: {}", e)),
            }

            window.clear();
            info!("Fault window closed");
        }

        if scenario.cooldown_secs > 0 && harness_error.is_none() {
            sleep(Duration::from_secs(scenario.cooldown_secs)).await;
        }

        cancel.cancel();

        let handoff = Duration::from_secs(self.config.settings.handoff_timeout_secs);
        match pool.collect(handoff).await {
            Ok(collected) => match harness_error {
                Some(e) => result.fail_with_error(&e),
                None => result.complete_with_results(&collected.merged),
            },
            Err(e) => {
                let msg = match harness_error {
                    Some(h) => format!("{}; additionally: {}", h, e),
                    None => e.to_string(),
                };
                result.fail_with_error(&msg);
            }
        }

        result
    }
}

async fn build_injector(fault: &FaultConfig) -> Result<Box<dyn FaultInjector>> {
    match fault {
        FaultConfig::None => Ok(Box::new(Noop)),
        FaultConfig::PodKill {
            namespace,
            selector,
            expected_ready,
        } => Ok(Box::new(
            PodKill::new(namespace, selector, *expected_ready).await?,
        )),
    }
}

async fn spawn_workload(
    client: Arc<dyn StorageClient>,
    window: &FaultWindow,
    cancel: &CancelToken,
    workload: &WorkloadConfig,
) -> Result<WorkerPool> {
    match workload {
        WorkloadConfig::ObjectStream {
            kind,
            iterations,
            workers,
            bucket,
            key_prefix,
            object_size,
            policy,
        } => {
            match client.create_bucket(bucket).await {
                Ok(()) | Err(ClientError::AlreadyExists(_)) => {}
                Err(e) => bail!("failed to prepare bucket {}: {}", bucket, e),
            }

            let cfg = WorkerConfig {
                iterations: *iterations,
                kind: *kind,
                bucket: bucket.clone(),
                key_prefix: key_prefix.clone(),
                object_size: *object_size,
                policy: *policy,
            };

            if *kind == WorkloadKind::ReadOnly {
                seed_objects(client.as_ref(), &cfg, *workers).await?;
            }

            Ok(WorkerPool::spawn(client, window, cancel, &cfg, *workers))
        }
        WorkloadConfig::BucketCrud { workers, crud } => {
            Ok(spawn_crud_workers(client, window, cancel, crud, *workers))
        }
    }
}

/// Empty and delete every bucket whose name starts with `prefix`
pub async fn cleanup_buckets(client: &dyn StorageClient, prefix: &str) -> Result<usize> {
    let mut removed = 0;

    for bucket in client.list_buckets().await? {
        if !bucket.starts_with(prefix) {
            continue;
        }

        for key in client.list_objects(&bucket, "").await? {
            client.delete_object(&bucket, &key).await?;
        }
        client.delete_bucket(&bucket).await?;

        info!("Deleted bucket: {}", bucket);
        removed += 1;
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{EndpointConfig, SuiteSettings};
    use crate::storage::MemoryClient;
    use crate::suite::Verdict;
    use crate::workload::{BucketCrudConfig, ClassifyPolicy};

    fn endpoint() -> EndpointConfig {
        EndpointConfig {
            url: None,
            region: "us-east-1".to_string(),
            access_key_env: "AWS_ACCESS_KEY_ID".to_string(),
            secret_key_env: "AWS_SECRET_ACCESS_KEY".to_string(),
            force_path_style: true,
        }
    }

    fn crud_scenario(id: &str) -> ScenarioConfig {
        ScenarioConfig {
            id: id.to_string(),
            workload: WorkloadConfig::BucketCrud {
                workers: 2,
                crud: BucketCrudConfig {
                    buckets: 2,
                    objects_per_bucket: 2,
                    object_size: 32,
                    bucket_prefix: "crud".to_string(),
                    skip_put: false,
                    skip_get: false,
                    skip_delete: false,
                    policy: ClassifyPolicy::TouchedAtAll,
                },
            },
            fault: FaultConfig::None,
            warmup_secs: 0,
            cooldown_secs: 0,
            recovery_timeout_secs: 30,
        }
    }

    fn suite(scenarios: Vec<ScenarioConfig>) -> SuiteConfig {
        SuiteConfig {
            name: "test".to_string(),
            description: String::new(),
            endpoint: endpoint(),
            scenarios,
            settings: SuiteSettings {
                handoff_timeout_secs: 5,
                cleanup_on_complete: false,
                ..SuiteSettings::default()
            },
        }
    }

    #[tokio::test]
    async fn test_baseline_crud_scenario_passes() {
        let client: Arc<dyn StorageClient> = Arc::new(MemoryClient::new());
        let runner = SuiteRunner::new(suite(vec![crud_scenario("baseline")]));

        let results = runner.run_with_client(client, None).await.unwrap();

        assert_eq!(results.scenarios.len(), 1);
        assert_eq!(results.scenarios[0].verdict, Verdict::Passed);
        assert!(results.passed());
    }

    #[tokio::test]
    async fn test_failing_backend_fails_scenario() {
        let client = Arc::new(MemoryClient::new());
        client.set_failing(true);
        let runner = SuiteRunner::new(suite(vec![crud_scenario("broken")]));

        let results = runner
            .run_with_client(Arc::clone(&client) as Arc<dyn StorageClient>, None)
            .await
            .unwrap();

        // No fault window was ever open, so every failure is a clear failure
        assert_eq!(results.scenarios[0].verdict, Verdict::Failed);
        assert!(results.scenarios[0].totals.failed_clear > 0);
        assert_eq!(results.scenarios[0].totals.failed_set, 0);
    }

    #[tokio::test]
    async fn test_scenario_filter() {
        let client: Arc<dyn StorageClient> = Arc::new(MemoryClient::new());
        let runner = SuiteRunner::new(suite(vec![
            crud_scenario("first"),
            crud_scenario("second"),
        ]));

        let results = runner.run_with_client(client, Some("second")).await.unwrap();

        assert_eq!(results.scenarios.len(), 1);
        assert_eq!(results.scenarios[0].scenario_id, "second");
    }

    #[tokio::test]
    async fn test_cleanup_buckets() {
        let client = MemoryClient::new();
        client.create_bucket("crud-w0-0").await.unwrap();
        client
            .put_object("crud-w0-0", "k", bytes::Bytes::from("x"))
            .await
            .unwrap();
        client.create_bucket("other").await.unwrap();

        let removed = cleanup_buckets(&client, "crud").await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(client.list_buckets().await.unwrap(), vec!["other"]);
    }
}
