use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of storage operation a worker attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    CreateBucket,
    PutObject,
    /// Read plus checksum verification of the returned body
    GetObject,
    DeleteObject,
    DeleteBucket,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::CreateBucket => write!(f, "create-bucket"),
            OpKind::PutObject => write!(f, "put-object"),
            OpKind::GetObject => write!(f, "get-object"),
            OpKind::DeleteObject => write!(f, "delete-object"),
            OpKind::DeleteBucket => write!(f, "delete-bucket"),
        }
    }
}

/// Outcome of a single workload unit.
///
/// Failures are values, never propagated exceptions: the worker loop always
/// produces one of these and carries on. A checksum mismatch is kept apart
/// from transport failure because it means the cluster returned wrong data,
/// not that it was unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Failed { error: String },
    ChecksumMismatch { expected: String, actual: String },
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }
}

/// Fault-window state under which an operation was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Clear,
    Set,
}

/// How to classify an operation that observed different window states at its
/// start and end.
///
/// The window is advisory, so an operation can straddle a `set()` or
/// `clear()` transition. Which side it lands on is a policy choice, made
/// explicit here instead of being an accident of sampling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyPolicy {
    /// Use the window state sampled before the operation started
    StartTime,
    /// Use the window state sampled after the operation finished
    EndTime,
    /// Classify as Set if either sample saw the window open
    #[default]
    TouchedAtAll,
}

impl ClassifyPolicy {
    pub fn classify(&self, before: bool, after: bool) -> WindowState {
        let set = match self {
            ClassifyPolicy::StartTime => before,
            ClassifyPolicy::EndTime => after,
            ClassifyPolicy::TouchedAtAll => before || after,
        };
        if set {
            WindowState::Set
        } else {
            WindowState::Clear
        }
    }
}

/// One attempted workload unit. Immutable once built; owned by the worker
/// that produced it until the bucket handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub op: OpKind,
    /// Bucket name, or "bucket/key" for object operations
    pub target: String,
    pub outcome: Outcome,
    pub window: WindowState,
}

impl OperationRecord {
    pub fn new(op: OpKind, target: impl Into<String>, outcome: Outcome, window: WindowState) -> Self {
        Self {
            op,
            target: target.into(),
            outcome,
            window,
        }
    }
}

/// Classified results of one worker's run.
///
/// Every record lands in exactly one of the four vectors, so the categories
/// always partition the attempted operations. Mutated only by the owning
/// worker; the controller sees it only after the worker has published and
/// terminated, which is why no locking is needed on the contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultBucket {
    pub ok_clear: Vec<OperationRecord>,
    pub failed_clear: Vec<OperationRecord>,
    pub ok_set: Vec<OperationRecord>,
    pub failed_set: Vec<OperationRecord>,
}

impl ResultBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: OperationRecord) {
        match (record.outcome.is_ok(), record.window) {
            (true, WindowState::Clear) => self.ok_clear.push(record),
            (false, WindowState::Clear) => self.failed_clear.push(record),
            (true, WindowState::Set) => self.ok_set.push(record),
            (false, WindowState::Set) => self.failed_set.push(record),
        }
    }

    pub fn merge(&mut self, other: ResultBucket) {
        self.ok_clear.extend(other.ok_clear);
        self.failed_clear.extend(other.failed_clear);
        self.ok_set.extend(other.ok_set);
        self.failed_set.extend(other.failed_set);
    }

    pub fn total(&self) -> usize {
        self.ok_clear.len() + self.failed_clear.len() + self.ok_set.len() + self.failed_set.len()
    }

    /// Failures observed while the window was clear. Any entry here is a
    /// hard test failure.
    pub fn clear_failures(&self) -> &[OperationRecord] {
        &self.failed_clear
    }

    /// Failures observed while the window was set. Tolerated but bounded.
    pub fn set_failures(&self) -> &[OperationRecord] {
        &self.failed_set
    }

    /// Everything attempted while the window was set, regardless of outcome
    pub fn set_attempts(&self) -> usize {
        self.ok_set.len() + self.failed_set.len()
    }

    /// Targets of records matching a predicate, across all four categories.
    /// Used by scenario assertions to derive pass/fail object or bucket
    /// lists.
    pub fn targets<F>(&self, mut pred: F) -> Vec<String>
    where
        F: FnMut(&OperationRecord) -> bool,
    {
        self.iter()
            .filter(|r| pred(r))
            .map(|r| r.target.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationRecord> {
        self.ok_clear
            .iter()
            .chain(self.failed_clear.iter())
            .chain(self.ok_set.iter())
            .chain(self.failed_set.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: Outcome, window: WindowState) -> OperationRecord {
        OperationRecord::new(OpKind::PutObject, "bucket/key", outcome, window)
    }

    #[test]
    fn test_push_partitions_records() {
        let mut bucket = ResultBucket::new();
        bucket.push(record(Outcome::Ok, WindowState::Clear));
        bucket.push(record(Outcome::Failed { error: "conn reset".into() }, WindowState::Clear));
        bucket.push(record(Outcome::Ok, WindowState::Set));
        bucket.push(record(Outcome::Failed { error: "timeout".into() }, WindowState::Set));

        assert_eq!(bucket.ok_clear.len(), 1);
        assert_eq!(bucket.failed_clear.len(), 1);
        assert_eq!(bucket.ok_set.len(), 1);
        assert_eq!(bucket.failed_set.len(), 1);
        assert_eq!(bucket.total(), 4);
    }

    #[test]
    fn test_checksum_mismatch_counts_as_failure() {
        let mut bucket = ResultBucket::new();
        bucket.push(record(
            Outcome::ChecksumMismatch {
                expected: "aa".into(),
                actual: "bb".into(),
            },
            WindowState::Clear,
        ));

        assert_eq!(bucket.clear_failures().len(), 1);
        assert_eq!(bucket.ok_clear.len(), 0);
    }

    #[test]
    fn test_merge_preserves_totals() {
        let mut a = ResultBucket::new();
        a.push(record(Outcome::Ok, WindowState::Clear));
        a.push(record(Outcome::Ok, WindowState::Set));

        let mut b = ResultBucket::new();
        b.push(record(Outcome::Failed { error: "x".into() }, WindowState::Set));

        a.merge(b);
        assert_eq!(a.total(), 3);
        assert_eq!(a.set_attempts(), 2);
    }

    #[test]
    fn test_classify_policies() {
        let cases = [
            // (before, after, start, end, touched)
            (false, false, WindowState::Clear, WindowState::Clear, WindowState::Clear),
            (true, false, WindowState::Set, WindowState::Clear, WindowState::Set),
            (false, true, WindowState::Clear, WindowState::Set, WindowState::Set),
            (true, true, WindowState::Set, WindowState::Set, WindowState::Set),
        ];

        for (before, after, start, end, touched) in cases {
            assert_eq!(ClassifyPolicy::StartTime.classify(before, after), start);
            assert_eq!(ClassifyPolicy::EndTime.classify(before, after), end);
            assert_eq!(ClassifyPolicy::TouchedAtAll.classify(before, after), touched);
        }
    }

    #[test]
    fn test_targets_filter() {
        let mut bucket = ResultBucket::new();
        bucket.push(OperationRecord::new(
            OpKind::CreateBucket,
            "bucket-1",
            Outcome::Ok,
            WindowState::Clear,
        ));
        bucket.push(OperationRecord::new(
            OpKind::CreateBucket,
            "bucket-2",
            Outcome::Failed { error: "503".into() },
            WindowState::Set,
        ));

        let failed = bucket.targets(|r| !r.outcome.is_ok());
        assert_eq!(failed, vec!["bucket-2".to_string()]);
    }
}
