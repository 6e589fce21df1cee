//! HA evaluation suite for S3-compatible storage clusters.
//!
//! Background workers issue a continuous storage workload while a controller
//! injects faults. An advisory fault window classifies every operation as
//! inside or outside the disruption, and the pass rule is simple: failures
//! inside the window are tolerated, failures outside it are not.

pub mod cli;
pub mod fault;
pub mod storage;
pub mod suite;
pub mod workload;
