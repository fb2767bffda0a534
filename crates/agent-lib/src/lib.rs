//! Agent library for Kubernetes-to-TinyMon synchronization
//!
//! This crate provides the core functionality for:
//! - Resource identity, annotation resolution and quantity parsing
//! - Health verdicts for nodes, workloads, volumes and backups
//! - The push API client for the monitoring service
//! - The sync engine and its per-kind plans
//! - Health checks and observability

pub mod derive;
pub mod health;
pub mod models;
pub mod observability;
pub mod push;
pub mod quantity;
pub mod resolver;
pub mod state;
pub mod sync;
pub mod telemetry;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PassOutcome, StructuredLogger, SyncMetrics};
pub use push::{PushApi, PushClient, PushClientBuilder, PushError, RetryPolicy};
pub use state::{ResourceState, StateProvider};
pub use sync::{SyncEngine, SyncError, SyncOutcome};
