//! Background-workload coordination: worker tasks issue storage operations
//! while a controller injects a fault, with every attempt classified by the
//! fault-window state observed around it.

mod crud;
mod driver;
mod record;
mod signal;

pub use crud::{run_bucket_crud, spawn_crud_workers, BucketCrudConfig};
pub use driver::{
    run_worker, seed_objects, CollectedResults, WorkerConfig, WorkerPool, WorkloadKind,
};
pub use record::{ClassifyPolicy, OpKind, OperationRecord, Outcome, ResultBucket, WindowState};
pub use signal::{CancelToken, FaultWindow};
