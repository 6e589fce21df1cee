mod report;
mod runner;

pub use report::{evaluate, BucketTotals, ScenarioResult, SuiteResults, SuiteSummary, Verdict};
pub use runner::{cleanup_buckets, SuiteRunner};
