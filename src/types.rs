/// Static process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub token: String,
    pub namespaces: Vec<String>,
    pub concurrency: usize,
    pub port: u16,
    pub insecure_tls: bool,
}

/// Metric kind in the exposition output. Everything this exporter emits is a
/// point-in-time measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
        }
    }
}

/// One sample destined for the exposition document. Many records share a
/// name and differ only by label set.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    /// Label pairs; keys are unique within one record.
    pub labels: Vec<(String, String)>,
    pub value: f64,
    /// Epoch seconds, possibly fractional.
    pub timestamp: f64,
}

impl MetricRecord {
    pub fn gauge(
        name: &'static str,
        help: &'static str,
        labels: Vec<(String, String)>,
        value: f64,
        timestamp: f64,
    ) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
            labels,
            value,
            timestamp,
        }
    }
}
