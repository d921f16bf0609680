pub mod checkpoint;
pub mod collector;
pub mod domain;
pub mod provider;
pub mod writer;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub workspace_id: Option<String>,
        pub workspace_key: Option<String>,
        pub factor_table_name: Option<String>,
        pub collector_host: Option<String>,
        pub scorecard_base_url: Option<String>,
        pub scorecard_api_key: Option<String>,
        pub checkpoint_path: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                workspace_id: std::env::var("WORKSPACE_ID").ok(),
                workspace_key: std::env::var("WORKSPACE_KEY").ok(),
                factor_table_name: std::env::var("FACTOR_TABLE_NAME").ok(),
                collector_host: std::env::var("COLLECTOR_HOST").ok(),
                scorecard_base_url: std::env::var("SCORECARD_BASE_URL").ok(),
                scorecard_api_key: std::env::var("SCORECARD_API_KEY").ok(),
                checkpoint_path: std::env::var("CHECKPOINT_PATH").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_workspace_id(&self) -> anyhow::Result<&str> {
            self.workspace_id
                .as_deref()
                .context("WORKSPACE_ID is required")
        }

        pub fn require_workspace_key(&self) -> anyhow::Result<&str> {
            self.workspace_key
                .as_deref()
                .context("WORKSPACE_KEY is required")
        }

        pub fn require_factor_table_name(&self) -> anyhow::Result<&str> {
            self.factor_table_name
                .as_deref()
                .context("FACTOR_TABLE_NAME is required")
        }

        pub fn require_scorecard_base_url(&self) -> anyhow::Result<&str> {
            self.scorecard_base_url
                .as_deref()
                .context("SCORECARD_BASE_URL is required")
        }
    }
}
