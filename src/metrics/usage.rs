use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Container, Pod};
use serde::Deserialize;

use crate::error::ExporterError;
use crate::kubernetes::ClusterClient;
use crate::metrics::derive::{derive_container_metrics, RateWarningSink};
use crate::types::MetricRecord;

/// Decoded response from the metrics endpoint for a single pod.
#[derive(Debug, Deserialize)]
pub struct PodUsage {
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub containers: Vec<ContainerUsage>,
}

/// Reported usage for one container within a pod sample.
#[derive(Debug, Deserialize)]
pub struct ContainerUsage {
    pub name: String,
    pub usage: ResourceUsage,
}

#[derive(Debug, Deserialize)]
pub struct ResourceUsage {
    pub memory: String,
    pub cpu: String,
}

/// Fetch the live usage sample for one pod and derive its metric records.
///
/// The response is validated before decoding: a status outside [200,299]
/// (or exactly 204) and any body that is not a PodMetrics object abort the
/// cycle. Containers without a matching spec entry still yield usage
/// gauges; their rate records are skipped.
pub async fn fetch_pod_usage(
    client: &ClusterClient,
    pod: &Pod,
    warnings: &dyn RateWarningSink,
) -> Result<Vec<MetricRecord>, ExporterError> {
    let name = pod.metadata.name.as_deref().unwrap_or_default();
    let namespace = pod.metadata.namespace.as_deref().unwrap_or("default");

    let (url, request) = client.get(&format!(
        "/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods/{}",
        namespace, name
    ));
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() || status.as_u16() == 204 {
        return Err(ExporterError::UpstreamStatus {
            status: status.as_u16(),
            url,
        });
    }

    let body: serde_json::Value = response.json().await?;
    let usage = decode_pod_usage(body)?;

    let timestamp = usage.timestamp.timestamp_millis() as f64 / 1000.0;
    let mut records = Vec::new();
    for container in &usage.containers {
        let spec = find_spec_container(pod, &container.name);
        records.extend(derive_container_metrics(
            name, namespace, container, spec, timestamp, warnings,
        )?);
    }
    Ok(records)
}

/// Typed decode-and-validate step over the raw JSON body.
pub fn decode_pod_usage(body: serde_json::Value) -> Result<PodUsage, ExporterError> {
    if !body.is_object() {
        return Err(ExporterError::UpstreamShape(format!(
            "expected a JSON object, got {}",
            json_kind(&body)
        )));
    }

    let usage: PodUsage = serde_json::from_value(body)
        .map_err(|e| ExporterError::UpstreamShape(e.to_string()))?;

    if usage.kind != "PodMetrics" {
        return Err(ExporterError::UpstreamShape(format!(
            "expected kind \"PodMetrics\", got {:?}",
            usage.kind
        )));
    }
    Ok(usage)
}

fn find_spec_container<'a>(pod: &'a Pod, name: &str) -> Option<&'a Container> {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.containers.iter().find(|c| c.name == name))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
