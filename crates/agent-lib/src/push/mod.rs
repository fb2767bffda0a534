//! Binding for the monitoring service push API
//!
//! This module provides:
//! - The [`PushApi`] seam the synchronization engine talks through
//! - An HTTP implementation with bearer authentication
//! - An explicit, bounded retry policy for transient failures

mod client;
mod retry;

pub use client::{ClientConfig, PushClient, PushClientBuilder};
pub use retry::RetryPolicy;

use crate::models::{MonitorCheck, MonitorHost, MonitorResult};
use async_trait::async_trait;
use std::fmt;

/// Remote operation, with its wire route and success contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    UpsertHost,
    DeleteHost,
    UpsertCheck,
    DeleteCheck,
    PushResult,
    PushBulk,
}

impl Operation {
    pub fn method(&self) -> reqwest::Method {
        match self {
            Operation::DeleteHost | Operation::DeleteCheck => reqwest::Method::DELETE,
            _ => reqwest::Method::POST,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Operation::UpsertHost | Operation::DeleteHost => "/api/push/hosts",
            Operation::UpsertCheck | Operation::DeleteCheck => "/api/push/checks",
            Operation::PushResult => "/api/push/results",
            Operation::PushBulk => "/api/push/bulk",
        }
    }

    /// Status codes that count as success for this operation
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            Operation::UpsertHost | Operation::UpsertCheck => matches!(status, 200 | 201),
            Operation::DeleteHost | Operation::DeleteCheck => matches!(status, 200 | 404),
            Operation::PushResult | Operation::PushBulk => status == 200,
        }
    }

    /// Label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Operation::UpsertHost => "upsert_host",
            Operation::DeleteHost => "delete_host",
            Operation::UpsertCheck => "upsert_check",
            Operation::DeleteCheck => "delete_check",
            Operation::PushResult => "push_result",
            Operation::PushBulk => "push_bulk",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().replace('_', " "))
    }
}

/// Failure of a push API call
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("invalid push API URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{operation} {target}: request failed: {source}")]
    Transport {
        operation: Operation,
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} {target}: unexpected status {status}")]
    UnexpectedStatus {
        operation: Operation,
        target: String,
        status: u16,
        body: String,
    },
}

impl PushError {
    /// Transport failures, 5xx and 429 may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            PushError::Transport { .. } => true,
            PushError::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            PushError::InvalidUrl { .. } | PushError::Client(_) => false,
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            PushError::Transport { operation, .. }
            | PushError::UnexpectedStatus { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// Idempotent operations against the push API
#[async_trait]
pub trait PushApi: Send + Sync {
    /// Create or replace the host keyed by its address
    async fn upsert_host(&self, host: &MonitorHost) -> Result<(), PushError>;

    /// Delete a host and, by cascade, its checks; a missing host is success
    async fn delete_host(&self, address: &str) -> Result<(), PushError>;

    /// Create or replace the check keyed by `(host_address, type)`
    async fn upsert_check(&self, check: &MonitorCheck) -> Result<(), PushError>;

    /// Delete one check; a missing check is success
    async fn delete_check(&self, host_address: &str, check_type: &str) -> Result<(), PushError>;

    async fn push_result(&self, result: &MonitorResult) -> Result<(), PushError>;

    async fn push_bulk(&self, results: &[MonitorResult]) -> Result<(), PushError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_contract() {
        for op in [Operation::UpsertHost, Operation::UpsertCheck] {
            assert!(op.accepts(200));
            assert!(op.accepts(201));
            assert!(!op.accepts(404));
            assert!(!op.accepts(204));
        }
        for op in [Operation::DeleteHost, Operation::DeleteCheck] {
            assert!(op.accepts(200));
            assert!(op.accepts(404));
            assert!(!op.accepts(201));
        }
        for op in [Operation::PushResult, Operation::PushBulk] {
            assert!(op.accepts(200));
            assert!(!op.accepts(201));
        }
    }

    #[test]
    fn test_routes() {
        assert_eq!(Operation::DeleteHost.method(), reqwest::Method::DELETE);
        assert_eq!(Operation::DeleteCheck.path(), "/api/push/checks");
        assert_eq!(Operation::PushBulk.method(), reqwest::Method::POST);
        assert_eq!(Operation::PushBulk.path(), "/api/push/bulk");
    }

    #[test]
    fn test_transient_classification() {
        let status = |status| PushError::UnexpectedStatus {
            operation: Operation::UpsertHost,
            target: "k8s://c/node/n".to_string(),
            status,
            body: String::new(),
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(401).is_transient());
        assert_eq!(
            status(400).to_string(),
            "upsert host k8s://c/node/n: unexpected status 400"
        );
    }
}
