use k8s_openapi::api::core::v1::Container;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::ExporterError;
use crate::metrics::usage::ContainerUsage;
use crate::parsing::{parse_cpu_millicores, parse_memory_bytes};
use crate::types::MetricRecord;

pub const MEMORY_USAGE: &str = "memory_usage";
pub const CPU_USAGE: &str = "cpu_usage";
pub const MEMORY_LIMIT_RATE: &str = "memory_limit_rate";
pub const MEMORY_REQUEST_RATE: &str = "memory_request_rate";
pub const CPU_LIMIT_RATE: &str = "cpu_limit_rate";
pub const CPU_REQUEST_RATE: &str = "cpu_request_rate";

/// Details of a usage sample that exceeded a declared bound. Observability
/// only; the record is still emitted.
#[derive(Debug)]
pub struct RateWarning<'a> {
    pub pod: &'a str,
    pub container: &'a str,
    /// "memory" or "cpu"
    pub resource: &'a str,
    /// "limit" or "request"
    pub bound: &'a str,
    /// Raw declared quantity from the pod spec
    pub declared: &'a str,
    /// Declared quantity in canonical units (bytes or millicores)
    pub declared_value: f64,
    /// Usage in canonical units
    pub usage: f64,
    pub rate: f64,
}

/// Side channel for usage-over-bound conditions, injected through the
/// pipeline instead of reaching for global state.
pub trait RateWarningSink: Send + Sync {
    fn rate_exceeded(&self, warning: &RateWarning<'_>);
}

/// Default sink: a warn-level tracing event.
pub struct TracingWarningSink;

impl RateWarningSink for TracingWarningSink {
    fn rate_exceeded(&self, w: &RateWarning<'_>) {
        warn!(
            pod = %w.pod,
            container = %w.container,
            declared = %w.declared,
            declared_value = w.declared_value,
            usage = w.usage,
            rate = w.rate,
            "{} usage exceeds declared {}",
            w.resource,
            w.bound,
        );
    }
}

/// Turn one (usage, spec) container pair into metric records.
///
/// Always two usage gauges; one rate gauge per declared limit/request
/// quantity. Rates above 1.0 fire the warning sink but are emitted anyway.
pub fn derive_container_metrics(
    pod: &str,
    namespace: &str,
    usage: &ContainerUsage,
    spec: Option<&Container>,
    timestamp: f64,
    warnings: &dyn RateWarningSink,
) -> Result<Vec<MetricRecord>, ExporterError> {
    let memory_bytes = parse_memory_bytes(&usage.usage.memory)?;
    let cpu_millicores = parse_cpu_millicores(&usage.usage.cpu)?;

    let labels = vec![
        ("pod".to_string(), pod.to_string()),
        ("container".to_string(), usage.name.clone()),
        ("namespace".to_string(), namespace.to_string()),
    ];

    let mut records = vec![
        MetricRecord::gauge(
            MEMORY_USAGE,
            "Container memory usage in bytes",
            labels.clone(),
            memory_bytes,
            timestamp,
        ),
        MetricRecord::gauge(
            CPU_USAGE,
            "Container cpu usage in millicores",
            labels.clone(),
            cpu_millicores,
            timestamp,
        ),
    ];

    let resources = spec.and_then(|c| c.resources.as_ref());
    let limits = resources.and_then(|r| r.limits.as_ref());
    let requests = resources.and_then(|r| r.requests.as_ref());

    let mut rate = |declared: Option<&Quantity>,
                    name: &'static str,
                    help: &'static str,
                    resource: &str,
                    bound: &str,
                    usage_value: f64,
                    parse: fn(&str) -> Result<f64, ExporterError>|
     -> Result<(), ExporterError> {
        let Some(declared) = declared else {
            return Ok(());
        };
        let declared_value = parse(&declared.0)?;
        let rate = usage_value / declared_value;
        if rate > 1.0 {
            warnings.rate_exceeded(&RateWarning {
                pod,
                container: &usage.name,
                resource,
                bound,
                declared: &declared.0,
                declared_value,
                usage: usage_value,
                rate,
            });
        }
        records.push(MetricRecord::gauge(name, help, labels.clone(), rate, timestamp));
        Ok(())
    };

    rate(
        limits.and_then(|l| l.get("memory")),
        MEMORY_LIMIT_RATE,
        "Container memory usage over its declared limit",
        "memory",
        "limit",
        memory_bytes,
        parse_memory_bytes,
    )?;
    rate(
        requests.and_then(|r| r.get("memory")),
        MEMORY_REQUEST_RATE,
        "Container memory usage over its declared request",
        "memory",
        "request",
        memory_bytes,
        parse_memory_bytes,
    )?;
    rate(
        limits.and_then(|l| l.get("cpu")),
        CPU_LIMIT_RATE,
        "Container cpu usage over its declared limit",
        "cpu",
        "limit",
        cpu_millicores,
        parse_cpu_millicores,
    )?;
    rate(
        requests.and_then(|r| r.get("cpu")),
        CPU_REQUEST_RATE,
        "Container cpu usage over its declared request",
        "cpu",
        "request",
        cpu_millicores,
        parse_cpu_millicores,
    )?;

    Ok(records)
}

/// Convenience for building spec resource maps in tests and fixtures.
pub fn quantity_map(entries: &[(&str, &str)]) -> BTreeMap<String, Quantity> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
        .collect()
}
