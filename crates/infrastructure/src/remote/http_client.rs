use std::time::Duration;

use async_trait::async_trait;
use composer_core::config::RemoteClientConfig;
use composer_core::traits::{RemoteResourceClient, RemoteResponse};
use composer_core::{ComposerError, ComposerResult};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

/// `reqwest` implementation of [`RemoteResourceClient`].
///
/// Absolute URIs are used as-is; relative ones are resolved against `base_url`.
pub struct HttpRemoteResourceClient {
    base_url: Option<String>,
    http_client: reqwest::Client,
}

impl HttpRemoteResourceClient {
    pub fn new(base_url: Option<String>, config: &RemoteClientConfig) -> ComposerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ComposerError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            http_client,
        })
    }

    fn resolve(&self, method: &Method, uri: &str) -> ComposerResult<String> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(uri.to_string());
        }
        let Some(ref base_url) = self.base_url else {
            return Err(ComposerError::Configuration(format!(
                "cannot {method} relative uri {uri} without a base url"
            )));
        };
        Ok(format!("{base_url}{uri}"))
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
    ) -> ComposerResult<RemoteResponse> {
        let url = self.resolve(&method, uri)?;
        let mut request = self.http_client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                let status = response.status().as_u16();
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| ComposerError::remote(method.as_str(), uri, e.to_string()))?;
                let body = if bytes.is_empty() {
                    None
                } else {
                    Some(serde_json::from_slice(&bytes).map_err(|e| {
                        ComposerError::remote(
                            method.as_str(),
                            uri,
                            format!("invalid JSON body: {e}"),
                        )
                    })?)
                };
                debug!(http.method = %method, http.url = %url, http.status = status, "remote request succeeded");
                Ok(RemoteResponse::new(status, body))
            }
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                warn!(http.method = %method, http.url = %url, http.status = status.as_u16(), "remote request rejected");
                Err(ComposerError::remote(
                    method.as_str(),
                    uri,
                    format!("HTTP {status} - {text}"),
                ))
            }
            Err(e) => {
                warn!(http.method = %method, http.url = %url, "remote request failed: {e}");
                Err(ComposerError::remote(method.as_str(), uri, e.to_string()))
            }
        }
    }
}

#[async_trait]
impl RemoteResourceClient for HttpRemoteResourceClient {
    async fn get(&self, uri: &str) -> ComposerResult<RemoteResponse> {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Option<&Value>) -> ComposerResult<RemoteResponse> {
        self.send(Method::POST, uri, body).await
    }

    async fn patch(&self, uri: &str, body: &Value) -> ComposerResult<RemoteResponse> {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> ComposerResult<RemoteResponse> {
        self.send(Method::DELETE, uri, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_uri_uses_base_url() {
        let client = HttpRemoteResourceClient::new(
            Some("https://10.0.0.5:8443/".to_string()),
            &RemoteClientConfig::default(),
        )
        .unwrap();
        assert_eq!(
            client.resolve(&Method::GET, "/redfish/v1/Systems").unwrap(),
            "https://10.0.0.5:8443/redfish/v1/Systems"
        );
        assert_eq!(
            client
                .resolve(&Method::GET, "http://other/redfish/v1")
                .unwrap(),
            "http://other/redfish/v1"
        );
    }

    #[test]
    fn test_relative_uri_without_base_is_rejected() {
        let client = HttpRemoteResourceClient::new(None, &RemoteClientConfig::default()).unwrap();
        let err = client.resolve(&Method::DELETE, "/redfish/v1/Systems/1").unwrap_err();
        assert!(matches!(err, ComposerError::Configuration(_)));
    }
}
