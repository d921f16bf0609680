mod error;
mod log_analytics;

pub use error::DeliveryError;
pub use log_analytics::LogAnalyticsClient;

/// Sink for one serialized batch of annotated factor records.
#[async_trait::async_trait]
pub trait FactorPublisher: Send + Sync {
    async fn publish(&self, body: String) -> anyhow::Result<()>;
}
