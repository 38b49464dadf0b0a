// Usage collection and metric derivation
pub mod derive;
pub mod usage;

// Re-export commonly used items
pub use derive::{derive_container_metrics, RateWarning, RateWarningSink, TracingWarningSink};
pub use usage::{decode_pod_usage, fetch_pod_usage, ContainerUsage, PodUsage, ResourceUsage};
