mod http;

pub use http::HttpCompany;

use crate::domain::config::WriteConfig;
use crate::domain::factor::FactorRecord;

/// Outcome of one factor fetch. `NoData` is the provider's explicit "nothing
/// new for this window" signal and is distinct from an empty batch.
#[derive(Debug, Clone)]
pub enum FactorFetch {
    Records(Vec<FactorRecord>),
    NoData,
}

/// External scoring-provider collaborator for one company. The retrieval
/// logic behind `get_factors` is the collaborator's own concern; this crate
/// only consumes its results.
#[async_trait::async_trait]
pub trait Company: Send + Sync {
    /// Company domain, used as the checkpoint key.
    fn domain(&self) -> &str;

    async fn get_factors(&self, config: &WriteConfig) -> anyhow::Result<FactorFetch>;

    async fn get_industry_name(&self) -> anyhow::Result<String>;
}
