// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod kubernetes;
pub mod metrics;
pub mod collector;
pub mod exposition;
pub mod server;

// Re-export commonly used items
pub use types::*;
pub use error::ExporterError;
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_cpu_millicores, parse_memory_bytes};
pub use kubernetes::{is_terminal, ClusterClient};
pub use metrics::*;
pub use collector::Collector;
pub use server::{create_router, AppState};
