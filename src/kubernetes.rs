use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::List;
use std::time::Duration;

use crate::error::ExporterError;

/// Per-call deadline on every request to the cluster. Timeouts surface as
/// ordinary fetch failures, not a distinct cancellation signal.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Bearer-authenticated access to the cluster API and its metrics endpoint.
/// Read-only for the lifetime of the process; clones share one transport.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl ClusterClient {
    pub fn new(base_url: &str, token: &str, insecure_tls: bool) -> Result<Self, ExporterError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(insecure_tls)
            .build()?;
        Ok(Self::with_http_client(base_url, token, http))
    }

    /// Transport override for callers that need their own TLS or proxy
    /// setup. The caller is responsible for configuring a timeout.
    pub fn with_http_client(base_url: &str, token: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn get(&self, path: &str) -> (String, reqwest::RequestBuilder) {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.get(&url).bearer_auth(&self.token);
        (url, builder)
    }

    /// List pod descriptors for one namespace.
    pub async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ExporterError> {
        let (url, request) = self.get(&format!("/api/v1/namespaces/{}/pods", namespace));
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExporterError::UpstreamStatus {
                status: status.as_u16(),
                url,
            });
        }

        let list: List<Pod> = response.json().await?;
        Ok(list.items)
    }
}

/// A terminal pod no longer reports resource usage and never contributes
/// metrics.
pub fn is_terminal(pod: &Pod) -> bool {
    matches!(
        pod.status.as_ref().and_then(|s| s.phase.as_deref()),
        Some("Succeeded") | Some("Failed")
    )
}
