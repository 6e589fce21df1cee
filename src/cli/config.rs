use crate::workload::{BucketCrudConfig, ClassifyPolicy, WorkloadKind};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for an HA evaluation suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Name of this suite
    pub name: String,

    /// Description of the suite
    #[serde(default)]
    pub description: String,

    /// Storage endpoint under test
    pub endpoint: EndpointConfig,

    /// Scenarios to run, in order
    pub scenarios: Vec<ScenarioConfig>,

    /// Global settings
    #[serde(default)]
    pub settings: SuiteSettings,
}

/// Connection details for the S3-compatible endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint URL; omit to use ambient AWS configuration
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    /// Environment variable holding the access key id
    #[serde(default = "default_access_key_env")]
    pub access_key_env: String,

    /// Environment variable holding the secret access key
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,

    /// Path-style addressing, required by most in-cluster gateways
    #[serde(default = "default_path_style")]
    pub force_path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_access_key_env() -> String {
    "AWS_ACCESS_KEY_ID".to_string()
}

fn default_secret_key_env() -> String {
    "AWS_SECRET_ACCESS_KEY".to_string()
}

fn default_path_style() -> bool {
    true
}

/// One fault scenario: a workload running in the background while a fault
/// is injected and recovered from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Unique identifier for this scenario
    pub id: String,

    pub workload: WorkloadConfig,

    #[serde(default)]
    pub fault: FaultConfig,

    /// Seconds of undisturbed load before the fault is injected
    #[serde(default = "default_warmup")]
    pub warmup_secs: u64,

    /// Seconds of undisturbed load after recovery, before workers stop
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,

    /// Maximum seconds to wait for cluster recovery after injection
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_secs: u64,
}

fn default_warmup() -> u64 {
    5
}

fn default_cooldown() -> u64 {
    5
}

fn default_recovery_timeout() -> u64 {
    300
}

/// Workload shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadConfig {
    /// Stream of object operations against one bucket
    ObjectStream {
        #[serde(default)]
        kind: WorkloadKind,
        /// Iterations per worker; omit to run until the fault completes
        iterations: Option<u32>,
        #[serde(default = "default_workers")]
        workers: usize,
        bucket: String,
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
        #[serde(default = "default_object_size")]
        object_size: usize,
        #[serde(default)]
        policy: ClassifyPolicy,
    },
    /// Bucket create/fill/verify/teardown cycles
    BucketCrud {
        #[serde(default = "default_workers")]
        workers: usize,
        #[serde(flatten)]
        crud: BucketCrudConfig,
    },
}

impl WorkloadConfig {
    pub fn workers(&self) -> usize {
        match self {
            WorkloadConfig::ObjectStream { workers, .. } => *workers,
            WorkloadConfig::BucketCrud { workers, .. } => *workers,
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_key_prefix() -> String {
    "ha-eval".to_string()
}

fn default_object_size() -> usize {
    4096
}

/// Fault to inject while the workload runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultConfig {
    /// No fault; baseline scenario
    #[default]
    None,
    /// Delete pods matching a label selector, wait for replacements
    PodKill {
        namespace: String,
        selector: String,
        expected_ready: usize,
    },
}

/// Global suite settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSettings {
    /// Seconds the controller waits for each worker's result handoff
    #[serde(default = "default_handoff_timeout")]
    pub handoff_timeout_secs: u64,

    /// Output directory for results
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Whether to delete leftover test buckets after the suite
    #[serde(default = "default_cleanup")]
    pub cleanup_on_complete: bool,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            handoff_timeout_secs: default_handoff_timeout(),
            output_dir: default_output_dir(),
            cleanup_on_complete: default_cleanup(),
        }
    }
}

fn default_handoff_timeout() -> u64 {
    60
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./ha-eval-results")
}

fn default_cleanup() -> bool {
    true
}

impl SuiteConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: SuiteConfig =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .context(format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Generate a sample configuration
    pub fn sample() -> Self {
        Self {
            name: "Sample HA Suite".to_string(),
            description: "Object workload under a pod kill, plus a baseline bucket CRUD run"
                .to_string(),
            endpoint: EndpointConfig {
                url: Some("http://localhost:9000".to_string()),
                region: default_region(),
                access_key_env: default_access_key_env(),
                secret_key_env: default_secret_key_env(),
                force_path_style: true,
            },
            scenarios: vec![
                ScenarioConfig {
                    id: "writes-during-pod-kill".to_string(),
                    workload: WorkloadConfig::ObjectStream {
                        kind: WorkloadKind::WriteOnly,
                        iterations: None,
                        workers: default_workers(),
                        bucket: "ha-eval-bench".to_string(),
                        key_prefix: default_key_prefix(),
                        object_size: default_object_size(),
                        policy: ClassifyPolicy::TouchedAtAll,
                    },
                    fault: FaultConfig::PodKill {
                        namespace: "storage".to_string(),
                        selector: "app=object-store".to_string(),
                        expected_ready: 3,
                    },
                    warmup_secs: default_warmup(),
                    cooldown_secs: default_cooldown(),
                    recovery_timeout_secs: default_recovery_timeout(),
                },
                ScenarioConfig {
                    id: "bucket-crud-baseline".to_string(),
                    workload: WorkloadConfig::BucketCrud {
                        workers: 2,
                        crud: BucketCrudConfig {
                            buckets: 4,
                            objects_per_bucket: 8,
                            object_size: default_object_size(),
                            bucket_prefix: "ha-eval-crud".to_string(),
                            skip_put: false,
                            skip_get: false,
                            skip_delete: false,
                            policy: ClassifyPolicy::TouchedAtAll,
                        },
                    },
                    fault: FaultConfig::None,
                    warmup_secs: 0,
                    cooldown_secs: 0,
                    recovery_timeout_secs: default_recovery_timeout(),
                },
            ],
            settings: SuiteSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config() {
        let config = SuiteConfig::sample();
        assert_eq!(config.scenarios.len(), 2);
        assert_eq!(config.scenarios[0].workload.workers(), 4);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = SuiteConfig::sample();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: SuiteConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.name, config.name);
        assert_eq!(parsed.scenarios.len(), config.scenarios.len());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.yaml");

        let config = SuiteConfig::sample();
        config.save(&path).unwrap();

        let loaded = SuiteConfig::load(&path).unwrap();
        assert_eq!(loaded.name, config.name);
        assert_eq!(loaded.endpoint.url, config.endpoint.url);
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
name: minimal
endpoint:
  url: http://localhost:9000
scenarios:
  - id: baseline
    workload:
      object_stream:
        bucket: bench
"#;
        let config: SuiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.settings.handoff_timeout_secs, 60);
        assert_eq!(config.scenarios[0].warmup_secs, 5);
        assert!(matches!(config.scenarios[0].fault, FaultConfig::None));
        match &config.scenarios[0].workload {
            WorkloadConfig::ObjectStream { workers, object_size, .. } => {
                assert_eq!(*workers, 4);
                assert_eq!(*object_size, 4096);
            }
            _ => panic!("expected object_stream workload"),
        }
    }
}
