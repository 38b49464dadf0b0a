use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;

use crate::types::Config;

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let endpoint = env
        .get_var("K8S_ENDPOINT")
        .ok_or_else(|| anyhow!("K8S_ENDPOINT env var must be set (cluster API base URL)"))?;
    let endpoint = endpoint.trim_end_matches('/').to_string();

    let token = env
        .get_var("K8S_TOKEN")
        .ok_or_else(|| anyhow!("K8S_TOKEN env var must be set (bearer credential)"))?;

    let namespaces = env.get_var("NAMESPACES").unwrap_or_default();
    let namespaces: Vec<String> = namespaces
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if namespaces.is_empty() {
        return Err(anyhow!("NAMESPACES env var must be set (comma-separated)"));
    }

    let concurrency: usize = env
        .get_var("CONCURRENCY")
        .unwrap_or_else(|| "10".to_string())
        .parse()
        .context("Invalid CONCURRENCY")?;
    if concurrency == 0 {
        return Err(anyhow!("CONCURRENCY must be at least 1"));
    }

    let port: u16 = env
        .get_var("PORT")
        .unwrap_or_else(|| "3000".to_string())
        .parse()
        .context("Invalid PORT")?;

    let insecure_tls = env
        .get_var("INSECURE_TLS")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false);

    Ok(Config {
        endpoint,
        token,
        namespaces,
        concurrency,
        port,
        insecure_tls,
    })
}
