use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteClientConfig {
    pub request_timeout_seconds: u64,
    pub max_retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub accept_invalid_certs: bool,
}

impl Default for RemoteClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 30,
            max_retry_attempts: 3,
            retry_base_delay_ms: 200,
            retry_max_delay_ms: 5_000,
            accept_invalid_certs: false,
        }
    }
}

impl RemoteClientConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("request_timeout_seconds must be greater than 0"));
        }
        if self.max_retry_attempts == 0 {
            return Err(anyhow::anyhow!("max_retry_attempts must be at least 1"));
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(anyhow::anyhow!(
                "retry_base_delay_ms must not exceed retry_max_delay_ms"
            ));
        }
        Ok(())
    }
}

/// A hardware management service this instance crawls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedServiceConfig {
    pub id: String,
    pub base_url: String,
    #[serde(default = "default_root_uri")]
    pub root_uri: String,
}

fn default_root_uri() -> String {
    "/redfish/v1".to_string()
}

impl ManagedServiceConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.id.trim().is_empty() {
            return Err(anyhow::anyhow!("managed service id must not be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "managed service {} has invalid base_url {}",
                self.id,
                self.base_url
            ));
        }
        if !self.root_uri.starts_with('/') {
            return Err(anyhow::anyhow!(
                "managed service {} root_uri must be absolute",
                self.id
            ));
        }
        Ok(())
    }
}
