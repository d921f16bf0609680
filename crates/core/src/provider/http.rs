use crate::config::Settings;
use crate::domain::config::WriteConfig;
use crate::domain::factor::FactorRecord;
use crate::provider::{Company, FactorFetch};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct FactorHistoryResponse {
    #[serde(default)]
    entries: Option<Vec<FactorRecord>>,
}

#[derive(Debug, Deserialize)]
struct CompanyResponse {
    industry: String,
}

/// Thin HTTP adapter over the scoring provider's REST surface for one
/// company. Query filters from the cycle config pass through untouched.
#[derive(Debug, Clone)]
pub struct HttpCompany {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    domain: String,
}

impl HttpCompany {
    pub fn from_settings(settings: &Settings, domain: impl Into<String>) -> anyhow::Result<Self> {
        let base_url = settings.require_scorecard_base_url()?.to_string();
        let api_key = settings.scorecard_api_key.clone();

        let timeout_secs = std::env::var("SCORECARD_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build scorecard http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            domain: domain.into(),
        })
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert(
                "authorization",
                HeaderValue::from_str(&format!("Token {api_key}"))?,
            );
        }
        Ok(headers)
    }

    fn company_url(&self) -> String {
        format!(
            "{}/companies/{}",
            self.base_url.trim_end_matches('/'),
            self.domain
        )
    }

    fn query(config: &WriteConfig) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(from) = &config.from_date_factor {
            query.push(("date_from".to_string(), from.clone()));
        }
        for (key, value) in &config.filters {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            query.push((key.clone(), value));
        }
        query
    }
}

#[async_trait::async_trait]
impl Company for HttpCompany {
    fn domain(&self) -> &str {
        &self.domain
    }

    async fn get_factors(&self, config: &WriteConfig) -> anyhow::Result<FactorFetch> {
        let url = format!("{}/history/factors", self.company_url());
        let res = self
            .http
            .get(url)
            .headers(self.headers()?)
            .query(&Self::query(config))
            .send()
            .await
            .context("factor fetch request failed")?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(FactorFetch::NoData);
        }

        let status = res.status();
        let text = res.text().await.context("failed to read factor response")?;
        if !status.is_success() {
            anyhow::bail!("factor fetch HTTP {status}: {text}");
        }

        let parsed: FactorHistoryResponse = serde_json::from_str(&text)
            .with_context(|| format!("factor response is not the expected shape: {text}"))?;

        match parsed.entries {
            None => Ok(FactorFetch::NoData),
            Some(entries) => Ok(FactorFetch::Records(entries)),
        }
    }

    async fn get_industry_name(&self) -> anyhow::Result<String> {
        let res = self
            .http
            .get(self.company_url())
            .headers(self.headers()?)
            .send()
            .await
            .context("company lookup request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read company response")?;
        if !status.is_success() {
            anyhow::bail!("company lookup HTTP {status}: {text}");
        }

        let parsed: CompanyResponse = serde_json::from_str(&text)
            .with_context(|| format!("company response is not the expected shape: {text}"))?;
        Ok(parsed.industry)
    }
}
