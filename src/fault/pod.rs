use crate::fault::FaultInjector;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, DeleteParams, ListParams},
    Client,
};
use std::time::Duration;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

/// Deletes the storage cluster's pods matching a label selector, then waits
/// for the replacement pods to come back Ready.
pub struct PodKill {
    client: Client,
    namespace: String,
    selector: String,
    /// Ready pods required before the cluster counts as recovered
    expected_ready: usize,
    check_interval: Duration,
}

impl PodKill {
    pub async fn new(namespace: &str, selector: &str, expected_ready: usize) -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;

        Ok(Self {
            client,
            namespace: namespace.to_string(),
            selector: selector.to_string(),
            expected_ready,
            check_interval: Duration::from_secs(5),
        })
    }

    /// Create with a specific client (for testing)
    #[allow(dead_code)]
    pub fn with_client(client: Client, namespace: &str, selector: &str, expected_ready: usize) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            selector: selector.to_string(),
            expected_ready,
            check_interval: Duration::from_secs(5),
        }
    }

    async fn matching_pods(&self) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let lp = ListParams::default().labels(&self.selector);
        let list = pods
            .list(&lp)
            .await
            .context(format!("Failed to list pods matching '{}'", self.selector))?;
        Ok(list.items)
    }

    fn is_ready(pod: &Pod) -> bool {
        let Some(status) = pod.status.as_ref() else {
            return false;
        };
        if status.phase.as_deref() != Some("Running") {
            return false;
        }
        status
            .container_statuses
            .as_ref()
            .map(|cs| !cs.is_empty() && cs.iter().all(|c| c.ready))
            .unwrap_or(false)
    }

    async fn ready_count(&self) -> Result<usize> {
        Ok(self
            .matching_pods()
            .await?
            .iter()
            .filter(|p| Self::is_ready(p))
            .count())
    }
}

#[async_trait]
impl FaultInjector for PodKill {
    fn describe(&self) -> String {
        format!("pod-kill [{}] in {}", self.selector, self.namespace)
    }

    async fn inject(&self) -> Result<()> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let targets = self.matching_pods().await?;

        if targets.is_empty() {
            bail!("no pods match selector '{}' in {}", self.selector, self.namespace);
        }

        for pod in targets {
            let Some(name) = pod.metadata.name else {
                continue;
            };
            info!("Deleting pod: {}", name);
            pods.delete(&name, &DeleteParams::default())
                .await
                .context(format!("Failed to delete pod: {}", name))?;
        }

        Ok(())
    }

    async fn confirm_recovered(&self, max_duration: Duration) -> Result<()> {
        info!(
            "Waiting for {} ready pods matching '{}' (max {}s)",
            self.expected_ready,
            self.selector,
            max_duration.as_secs()
        );

        let result = timeout(max_duration, async {
            let mut ticker = interval(self.check_interval);
            loop {
                ticker.tick().await;
                match self.ready_count().await {
                    Ok(ready) => {
                        debug!("{}/{} pods ready", ready, self.expected_ready);
                        if ready >= self.expected_ready {
                            info!("Cluster recovered: {} pods ready", ready);
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        warn!("Pod readiness check failed: {}", e);
                    }
                }
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => bail!(
                "cluster did not recover within {:?}: fewer than {} pods ready",
                max_duration,
                self.expected_ready
            ),
        }
    }
}
