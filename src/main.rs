use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use kube_usage_exporter::collector::Collector;
use kube_usage_exporter::config::load_config;
use kube_usage_exporter::kubernetes::ClusterClient;
use kube_usage_exporter::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    info!("namespaces = {:?}", cfg.namespaces);

    let client = ClusterClient::new(&cfg.endpoint, &cfg.token, cfg.insecure_tls)?;
    let collector = Arc::new(Collector::new(client, cfg.concurrency));
    let state = Arc::new(AppState::new(collector, cfg.namespaces.clone()));

    server::serve(cfg.port, state).await
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
