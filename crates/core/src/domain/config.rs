use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-cycle configuration handed to the writer for one company run.
/// Unknown keys are provider-specific filters and flow through to the factor
/// fetch untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date_factor: Option<String>,

    #[serde(
        rename = "portfolioId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub portfolio_id: Option<String>,

    #[serde(
        rename = "portfolioName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub portfolio_name: Option<String>,

    /// Severity attached to outgoing records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_factor_change: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_override_portfolio_factor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_override_own_factor: Option<String>,

    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl WriteConfig {
    pub fn portfolio_scoped(&self) -> bool {
        self.portfolio_id.is_some() && self.portfolio_name.is_some()
    }

    /// When the applicable override flag is the string `"true"`, every fetched
    /// record is forwarded regardless of its `diff`.
    pub fn diff_override(&self) -> bool {
        let flag = if self.portfolio_scoped() {
            self.diff_override_portfolio_factor.as_deref()
        } else {
            self.diff_override_own_factor.as_deref()
        };
        flag == Some("true")
    }
}
