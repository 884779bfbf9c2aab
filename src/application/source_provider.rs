// Provider trait for producing device readings
use crate::domain::reading::Reading;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("telemetry endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("telemetry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("could not decode telemetry response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Produce one reading now
    async fn fetch_latest(&self) -> Result<Reading, ProviderError>;

    /// Produce the last `count` readings now, oldest first
    async fn fetch_history(&self, count: usize) -> Result<Vec<Reading>, ProviderError>;
}
