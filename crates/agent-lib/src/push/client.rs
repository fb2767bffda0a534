//! HTTP client for the push API
//!
//! Every call serializes its payload as JSON, authenticates with a bearer
//! token and checks the response code against the operation's success
//! contract. Transient failures are retried per the configured
//! [`RetryPolicy`]; the default client makes a single attempt.

use super::{Operation, PushApi, PushError, RetryPolicy};
use crate::models::{MonitorCheck, MonitorHost, MonitorResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the push client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the monitoring service (e.g., "https://tinymon.example.com")
    pub base_url: String,
    /// Bearer credential
    pub api_key: String,
    /// Per-call timeout
    pub request_timeout: Duration,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://tinymon:8080".to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::none(),
        }
    }
}

#[derive(Serialize)]
struct DeleteHostBody<'a> {
    address: &'a str,
}

#[derive(Serialize)]
struct DeleteCheckBody<'a> {
    host_address: &'a str,
    #[serde(rename = "type")]
    check_type: &'a str,
}

#[derive(Serialize)]
struct BulkBody<'a> {
    results: &'a [MonitorResult],
}

/// Push API client backed by reqwest
#[derive(Debug, Clone)]
pub struct PushClient {
    http: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl PushClient {
    /// Create a single-attempt client with default timeouts
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, PushError> {
        PushClientBuilder::new()
            .base_url(base_url)
            .api_key(api_key)
            .build()
    }

    fn from_config(config: ClientConfig) -> Result<Self, PushError> {
        let parsed = Url::parse(&config.base_url).map_err(|e| PushError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PushError::InvalidUrl {
                url: config.base_url,
                reason: "scheme must be http or https".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(PushError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            retry: config.retry,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn send_once<B: Serialize + ?Sized>(
        &self,
        operation: Operation,
        target: &str,
        body: &B,
    ) -> Result<(), PushError> {
        let url = format!("{}{}", self.base_url, operation.path());
        let response = self
            .http
            .request(operation.method(), &url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|source| PushError::Transport {
                operation,
                target: target.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        if operation.accepts(status) {
            debug!(operation = %operation, target = %target, status, "Push API call succeeded");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PushError::UnexpectedStatus {
            operation,
            target: target.to_string(),
            status,
            body,
        })
    }

    async fn execute<B: Serialize + Sync + ?Sized>(
        &self,
        operation: Operation,
        target: &str,
        body: &B,
    ) -> Result<(), PushError> {
        let mut attempt = 1;
        loop {
            match self.send_once(operation, target, body).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff_for(attempt);
                    warn!(
                        operation = %operation,
                        target = %target,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Push API call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl PushApi for PushClient {
    async fn upsert_host(&self, host: &MonitorHost) -> Result<(), PushError> {
        self.execute(Operation::UpsertHost, &host.address, host).await
    }

    async fn delete_host(&self, address: &str) -> Result<(), PushError> {
        self.execute(Operation::DeleteHost, address, &DeleteHostBody { address })
            .await
    }

    async fn upsert_check(&self, check: &MonitorCheck) -> Result<(), PushError> {
        let target = format!("{}/{}", check.host_address, check.check_type);
        self.execute(Operation::UpsertCheck, &target, check).await
    }

    async fn delete_check(&self, host_address: &str, check_type: &str) -> Result<(), PushError> {
        let target = format!("{}/{}", host_address, check_type);
        let body = DeleteCheckBody {
            host_address,
            check_type,
        };
        self.execute(Operation::DeleteCheck, &target, &body).await
    }

    async fn push_result(&self, result: &MonitorResult) -> Result<(), PushError> {
        let target = format!("{}/{}", result.host_address, result.check_type);
        self.execute(Operation::PushResult, &target, result).await
    }

    async fn push_bulk(&self, results: &[MonitorResult]) -> Result<(), PushError> {
        let target = format!("{} results", results.len());
        self.execute(Operation::PushBulk, &target, &BulkBody { results })
            .await
    }
}

/// Builder for PushClient configuration
pub struct PushClientBuilder {
    config: ClientConfig,
}

impl PushClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn build(self) -> Result<PushClient, PushError> {
        PushClient::from_config(self.config)
    }
}

impl Default for PushClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
