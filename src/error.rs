use thiserror::Error;

/// Everything that can abort a collection cycle. None of these are retried;
/// they propagate unchanged to the request boundary.
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("unable to parse quantity {raw:?}: {reason}")]
    Quantity { raw: String, reason: String },

    #[error("metrics endpoint returned status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("unexpected metrics payload: {0}")]
    UpstreamShape(String),

    #[error("request to cluster failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("usage fetch task failed: {0}")]
    Pool(String),
}

impl ExporterError {
    pub fn quantity(raw: &str, reason: impl Into<String>) -> Self {
        Self::Quantity {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}
