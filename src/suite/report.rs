use crate::workload::ResultBucket;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scenario outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No failures outside the fault window
    Passed,
    /// At least one operation failed while the window was clear
    Failed,
    /// The harness itself broke: recovery timeout, missing handoff, setup
    /// failure. Says nothing about the cluster.
    Error,
}

/// Pass/fail rule for a collected result set: failures inside the window are
/// tolerated, failures outside it are not.
pub fn evaluate(bucket: &ResultBucket) -> Verdict {
    if bucket.clear_failures().is_empty() {
        Verdict::Passed
    } else {
        Verdict::Failed
    }
}

/// Record counts per classification category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketTotals {
    pub ok_clear: usize,
    pub failed_clear: usize,
    pub ok_set: usize,
    pub failed_set: usize,
}

impl From<&ResultBucket> for BucketTotals {
    fn from(bucket: &ResultBucket) -> Self {
        Self {
            ok_clear: bucket.ok_clear.len(),
            failed_clear: bucket.failed_clear.len(),
            ok_set: bucket.ok_set.len(),
            failed_set: bucket.failed_set.len(),
        }
    }
}

impl BucketTotals {
    pub fn total(&self) -> usize {
        self.ok_clear + self.failed_clear + self.ok_set + self.failed_set
    }
}

/// Result of a single scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario identifier from the config
    pub scenario_id: String,
    /// Fault description, from the injector
    pub fault: String,
    /// Worker tasks that ran
    pub workers: usize,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub completed_at: Option<DateTime<Utc>>,
    /// Duration in seconds
    pub duration_seconds: Option<u64>,
    pub verdict: Verdict,
    pub totals: BucketTotals,
    /// One summary line per failure outside the window
    pub clear_failures: Vec<String>,
    /// Harness error if the scenario could not be evaluated
    pub error: Option<String>,
}

impl ScenarioResult {
    pub fn new(scenario_id: &str, fault: &str, workers: usize) -> Self {
        Self {
            scenario_id: scenario_id.to_string(),
            fault: fault.to_string(),
            workers,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            verdict: Verdict::Error,
            totals: BucketTotals::default(),
            clear_failures: Vec::new(),
            error: None,
        }
    }

    fn stamp_completed(&mut self) {
        self.completed_at = Some(Utc::now());
        self.duration_seconds = Some(
            (self.completed_at.unwrap() - self.started_at)
                .num_seconds()
                .max(0) as u64,
        );
    }

    pub fn complete_with_results(&mut self, merged: &ResultBucket) {
        self.stamp_completed();
        self.totals = BucketTotals::from(merged);
        self.clear_failures = merged
            .clear_failures()
            .iter()
            .map(|r| format!("{} {}: {:?}", r.op, r.target, r.outcome))
            .collect();
        self.verdict = evaluate(merged);
    }

    pub fn fail_with_error(&mut self, error: &str) {
        self.stamp_completed();
        self.error = Some(error.to_string());
        self.verdict = Verdict::Error;
    }
}

/// Summary statistics for the suite
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total_scenarios: u32,
    pub passed: u32,
    pub failed: u32,
    pub errors: u32,
    /// Operations attempted across all scenarios
    pub total_operations: u32,
    /// Failures outside any fault window, across all scenarios
    pub clear_failures: u32,
}

/// Complete suite results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResults {
    /// Suite name from the config
    pub name: String,
    /// Unique suite run ID
    pub suite_id: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub completed_at: Option<DateTime<Utc>>,
    /// Individual scenario results, in execution order
    pub scenarios: Vec<ScenarioResult>,
    pub summary: SuiteSummary,
}

impl SuiteResults {
    pub fn new(name: &str, suite_id: &str) -> Self {
        Self {
            name: name.to_string(),
            suite_id: suite_id.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            scenarios: Vec::new(),
            summary: SuiteSummary::default(),
        }
    }

    pub fn add_scenario(&mut self, result: ScenarioResult) {
        self.scenarios.push(result);
    }

    pub fn passed(&self) -> bool {
        self.summary.failed == 0 && self.summary.errors == 0
    }

    fn recalculate(&mut self) {
        let mut summary = SuiteSummary {
            total_scenarios: self.scenarios.len() as u32,
            ..SuiteSummary::default()
        };

        for scenario in &self.scenarios {
            match scenario.verdict {
                Verdict::Passed => summary.passed += 1,
                Verdict::Failed => summary.failed += 1,
                Verdict::Error => summary.errors += 1,
            }
            summary.total_operations += scenario.totals.total() as u32;
            summary.clear_failures += scenario.totals.failed_clear as u32;
        }

        self.summary = summary;
    }

    /// Finalize the results
    pub fn finalize(&mut self) {
        self.completed_at = Some(Utc::now());
        self.recalculate();
    }

    /// Save results to a JSON file
    pub fn save_json(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Generate a human-readable report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!("# HA Evaluation Report: {}\n\n", self.name));
        report.push_str(&format!("Suite ID: {}\n", self.suite_id));
        report.push_str(&format!("Started: {}\n", self.started_at));
        if let Some(completed) = self.completed_at {
            report.push_str(&format!("Completed: {}\n", completed));
        }
        report.push('\n');

        report.push_str("## Summary\n\n");
        report.push_str(&format!("- Scenarios: {}\n", self.summary.total_scenarios));
        report.push_str(&format!("- Passed: {}\n", self.summary.passed));
        report.push_str(&format!("- Failed: {}\n", self.summary.failed));
        report.push_str(&format!("- Errors: {}\n", self.summary.errors));
        report.push_str(&format!(
            "- Total Operations: {}\n",
            self.summary.total_operations
        ));
        report.push_str(&format!(
            "- Failures Outside Window: {}\n",
            self.summary.clear_failures
        ));
        report.push('\n');

        report.push_str("## Scenarios\n\n");
        report.push_str("| Scenario | Fault | Verdict | Ops | Ok/Failed (clear) | Ok/Failed (window) |\n");
        report.push_str("|----------|-------|---------|-----|-------------------|--------------------|\n");

        for scenario in &self.scenarios {
            report.push_str(&format!(
                "| {} | {} | {:?} | {} | {}/{} | {}/{} |\n",
                scenario.scenario_id,
                scenario.fault,
                scenario.verdict,
                scenario.totals.total(),
                scenario.totals.ok_clear,
                scenario.totals.failed_clear,
                scenario.totals.ok_set,
                scenario.totals.failed_set,
            ));
        }

        report.push_str("\n## Scenario Details\n\n");

        for scenario in &self.scenarios {
            report.push_str(&format!("### {}\n", scenario.scenario_id));
            report.push_str(&format!("- Fault: {}\n", scenario.fault));
            report.push_str(&format!("- Verdict: {:?}\n", scenario.verdict));
            report.push_str(&format!("- Workers: {}\n", scenario.workers));
            if let Some(duration) = scenario.duration_seconds {
                report.push_str(&format!("- Duration: {}s\n", duration));
            }
            if let Some(ref error) = scenario.error {
                report.push_str(&format!("- Error: {}\n", error));
            }
            if !scenario.clear_failures.is_empty() {
                report.push_str("- Failures outside the window:\n");
                for failure in &scenario.clear_failures {
                    report.push_str(&format!("  - {}\n", failure));
                }
            }
            report.push('\n');
        }

        report
    }
}
