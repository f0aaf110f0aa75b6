use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use composer_core::config::RemoteClientConfig;
use composer_core::traits::{RemoteResourceClient, RemoteResponse};
use composer_core::ComposerResult;
use serde_json::Value;
use tracing::warn;

use crate::observability::MetricsCollector;

/// Exponential backoff with jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Fraction of the delay added or removed at random (0.0-1.0).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RemoteClientConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RemoteClientConfig) -> Self {
        Self {
            max_attempts: config.max_retry_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let capped = (base * self.backoff_multiplier.powi(exponent)).min(self.max_delay.as_secs_f64());
        let jitter = capped * self.jitter_factor * (rand::random::<f64>() - 0.5) * 2.0;
        Duration::from_secs_f64((capped + jitter).max(0.0))
    }
}

/// Retries failed remote calls according to a [`RetryPolicy`]. The last error
/// is returned once attempts are exhausted; local errors are returned at once.
pub struct RetryingRemoteClient {
    inner: Arc<dyn RemoteResourceClient>,
    policy: RetryPolicy,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RetryingRemoteClient {
    pub fn new(inner: Arc<dyn RemoteResourceClient>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn call(&self, uri: &str, call: Call<'_>) -> ComposerResult<RemoteResponse> {
        let method = call.method();
        let mut attempt = 1;
        loop {
            let result = match call {
                Call::Get => self.inner.get(uri).await,
                Call::Post(body) => self.inner.post(uri, body).await,
                Call::Patch(body) => self.inner.patch(uri, body).await,
                Call::Delete => self.inner.delete(uri).await,
            };
            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_remote() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        http.method = method,
                        http.uri = uri,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "remote call failed, retrying in {delay:?}: {e}"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_remote_retry(method);
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Call<'a> {
    Get,
    Post(Option<&'a Value>),
    Patch(&'a Value),
    Delete,
}

impl Call<'_> {
    fn method(&self) -> &'static str {
        match self {
            Call::Get => "GET",
            Call::Post(_) => "POST",
            Call::Patch(_) => "PATCH",
            Call::Delete => "DELETE",
        }
    }
}

#[async_trait]
impl RemoteResourceClient for RetryingRemoteClient {
    async fn get(&self, uri: &str) -> ComposerResult<RemoteResponse> {
        self.call(uri, Call::Get).await
    }

    async fn post(&self, uri: &str, body: Option<&Value>) -> ComposerResult<RemoteResponse> {
        self.call(uri, Call::Post(body)).await
    }

    async fn patch(&self, uri: &str, body: &Value) -> ComposerResult<RemoteResponse> {
        self.call(uri, Call::Patch(body)).await
    }

    async fn delete(&self, uri: &str) -> ComposerResult<RemoteResponse> {
        self.call(uri, Call::Delete).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use composer_core::ComposerError;

    use super::*;

    struct FlakyClient {
        calls: AtomicU32,
        failures_before_success: u32,
    }

    #[async_trait]
    impl RemoteResourceClient for FlakyClient {
        async fn get(&self, uri: &str) -> ComposerResult<RemoteResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures_before_success {
                Err(ComposerError::remote("GET", uri, "503"))
            } else {
                Ok(RemoteResponse::new(200, None))
            }
        }

        async fn post(&self, uri: &str, _body: Option<&Value>) -> ComposerResult<RemoteResponse> {
            self.get(uri).await
        }

        async fn patch(&self, uri: &str, _body: &Value) -> ComposerResult<RemoteResponse> {
            self.get(uri).await
        }

        async fn delete(&self, uri: &str) -> ComposerResult<RemoteResponse> {
            self.get(uri).await
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let flaky = Arc::new(FlakyClient {
            calls: AtomicU32::new(0),
            failures_before_success: 2,
        });
        let client = RetryingRemoteClient::new(flaky.clone(), quick_policy(3));

        assert!(client.delete("/redfish/v1/Systems/1").await.is_ok());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let flaky = Arc::new(FlakyClient {
            calls: AtomicU32::new(0),
            failures_before_success: 10,
        });
        let client = RetryingRemoteClient::new(flaky.clone(), quick_policy(3));

        let err = client.get("/redfish/v1/Systems/1").await.unwrap_err();
        assert!(err.is_remote());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_local_errors_are_not_retried() {
        struct Misconfigured(AtomicU32);

        #[async_trait]
        impl RemoteResourceClient for Misconfigured {
            async fn get(&self, _uri: &str) -> ComposerResult<RemoteResponse> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(ComposerError::Configuration("no base url".to_string()))
            }

            async fn post(&self, uri: &str, _body: Option<&Value>) -> ComposerResult<RemoteResponse> {
                self.get(uri).await
            }

            async fn patch(&self, uri: &str, _body: &Value) -> ComposerResult<RemoteResponse> {
                self.get(uri).await
            }

            async fn delete(&self, uri: &str) -> ComposerResult<RemoteResponse> {
                self.get(uri).await
            }
        }

        let inner = Arc::new(Misconfigured(AtomicU32::new(0)));
        let client = RetryingRemoteClient::new(inner.clone(), quick_policy(3));

        let err = client.get("/redfish/v1").await.unwrap_err();
        assert!(matches!(err, ComposerError::Configuration(_)));
        assert_eq!(inner.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(8), Duration::from_millis(500));
    }
}
