//! Fault-injector seam for the scenario controller.
//!
//! The controller only needs two things from an injector: produce the fault,
//! and synchronously confirm the cluster has reached its expected post-fault
//! state so the window can be closed. The mechanism itself belongs to the
//! environment, not to this crate.

mod pod;

pub use pod::PodKill;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait FaultInjector: Send + Sync {
    /// Human-readable label for logs and reports
    fn describe(&self) -> String;

    /// Produce the fault. Called after the controller opens the window.
    async fn inject(&self) -> Result<()>;

    /// Block until the cluster is confirmed recovered, or fail after
    /// `timeout`. The controller closes the window only after this returns.
    async fn confirm_recovered(&self, timeout: Duration) -> Result<()>;
}

/// No fault at all. Used for baseline scenarios where every operation is
/// expected to succeed.
pub struct Noop;

#[async_trait]
impl FaultInjector for Noop {
    fn describe(&self) -> String {
        "none".to_string()
    }

    async fn inject(&self) -> Result<()> {
        Ok(())
    }

    async fn confirm_recovered(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}
