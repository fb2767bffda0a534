//! Synchronization of cluster resources with the monitoring service
//!
//! This module provides:
//! - Per-kind plans describing hosts, checks and results
//! - The sync engine driving the host/check/result protocol

mod engine;
mod plan;

#[cfg(test)]
mod tests;

pub use engine::{SyncEngine, SyncError, SyncOutcome};
pub use plan::{KindPlan, PlanContext};
