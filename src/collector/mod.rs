use futures::future::try_join_all;
use k8s_openapi::api::core::v1::Pod;
use std::sync::Arc;
use tracing::debug;

use crate::error::ExporterError;
use crate::kubernetes::{is_terminal, ClusterClient};
use crate::metrics::derive::{RateWarningSink, TracingWarningSink};
use crate::metrics::usage::fetch_pod_usage;
use crate::types::MetricRecord;

pub mod pool;

/// Orchestrates one collection cycle: list, filter, fetch under the
/// concurrency bound, flatten. No retries, no partial recovery.
pub struct Collector {
    client: ClusterClient,
    concurrency: usize,
    warnings: Arc<dyn RateWarningSink>,
}

impl Collector {
    pub fn new(client: ClusterClient, concurrency: usize) -> Self {
        Self::with_warning_sink(client, concurrency, Arc::new(TracingWarningSink))
    }

    pub fn with_warning_sink(
        client: ClusterClient,
        concurrency: usize,
        warnings: Arc<dyn RateWarningSink>,
    ) -> Self {
        Self {
            client,
            concurrency,
            warnings,
        }
    }

    /// Run one full collection cycle over the given namespaces.
    pub async fn collect(&self, namespaces: &[String]) -> Result<Vec<MetricRecord>, ExporterError> {
        // Namespace listings run concurrently and unbounded; namespace
        // counts are assumed small.
        let listings = namespaces.iter().map(|ns| self.client.list_pods(ns));
        let pods: Vec<Pod> = try_join_all(listings)
            .await?
            .into_iter()
            .flatten()
            .filter(|pod| !is_terminal(pod) && pod.metadata.name.is_some())
            .collect();

        debug!(pods = pods.len(), "listed pods for collection cycle");

        let client = self.client.clone();
        let warnings = self.warnings.clone();
        let per_pod = pool::run_bounded(pods, self.concurrency, move |pod| {
            let client = client.clone();
            let warnings = warnings.clone();
            async move { fetch_pod_usage(&client, &pod, warnings.as_ref()).await }
        })
        .await?;

        Ok(per_pod.into_iter().flatten().collect())
    }
}
