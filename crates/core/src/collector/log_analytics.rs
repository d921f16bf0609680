use crate::collector::{DeliveryError, FactorPublisher};
use crate::config::Settings;
use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;
use std::time::Duration;

const DEFAULT_COLLECTOR_HOST: &str = "ods.opinsights.azure.com";
const API_VERSION: &str = "2016-04-01";
const RESOURCE: &str = "/api/logs";
const CONTENT_TYPE: &str = "application/json";

// Field in the posted records that carries the event timestamp.
const TIME_GENERATED_FIELD: &str = "ss_time";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

type HmacSha256 = Hmac<Sha256>;

/// Posts signed factor batches to the log-analytics collector.
///
/// Identity and secret are injected at construction so tests can run against
/// fake credentials.
#[derive(Debug, Clone)]
pub struct LogAnalyticsClient {
    http: reqwest::Client,
    workspace_id: String,
    shared_key: String,
    log_type: String,
    host: String,
}

impl LogAnalyticsClient {
    pub fn new(
        workspace_id: impl Into<String>,
        shared_key: impl Into<String>,
        log_type: impl Into<String>,
        host: Option<String>,
    ) -> anyhow::Result<Self> {
        let timeout_secs = std::env::var("COLLECTOR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build collector http client")?;

        Ok(Self {
            http,
            workspace_id: workspace_id.into(),
            shared_key: shared_key.into(),
            log_type: log_type.into(),
            host: host.unwrap_or_else(|| DEFAULT_COLLECTOR_HOST.to_string()),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            settings.require_workspace_id()?,
            settings.require_workspace_key()?,
            settings.require_factor_table_name()?,
            settings.collector_host.clone(),
        )
    }

    /// Shared-key authorization token for one request. Deterministic for
    /// fixed inputs; the shared secret must be valid base64.
    pub fn build_signature(
        &self,
        date: &str,
        content_length: usize,
        method: &str,
        content_type: &str,
        resource: &str,
    ) -> Result<String, DeliveryError> {
        let string_to_hash =
            format!("{method}\n{content_length}\n{content_type}\nx-ms-date:{date}\n{resource}");

        let key = BASE64.decode(&self.shared_key).map_err(|err| DeliveryError {
            stage: "signature",
            status: None,
            detail: format!("shared key is not valid base64: {err}"),
        })?;
        let mut mac = HmacSha256::new_from_slice(&key).map_err(|err| DeliveryError {
            stage: "signature",
            status: None,
            detail: format!("shared key rejected: {err}"),
        })?;
        mac.update(string_to_hash.as_bytes());
        let encoded_hash = BASE64.encode(mac.finalize().into_bytes());

        Ok(format!("SharedKey {}:{encoded_hash}", self.workspace_id))
    }

    fn uri(&self) -> String {
        format!(
            "https://{}.{}{RESOURCE}?api-version={API_VERSION}",
            self.workspace_id, self.host
        )
    }

    /// One POST of `body`, signed at `signed_at`. The same timestamp feeds the
    /// signature and the `x-ms-date` header so the two never diverge.
    pub async fn post_data(&self, body: String, signed_at: DateTime<Utc>) -> anyhow::Result<()> {
        let rfc1123 = signed_at.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let authorization =
            self.build_signature(&rfc1123, body.len(), "POST", CONTENT_TYPE, RESOURCE)?;

        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static(CONTENT_TYPE));
        headers.insert("authorization", HeaderValue::from_str(&authorization)?);
        headers.insert("log-type", HeaderValue::from_str(&self.log_type)?);
        headers.insert("x-ms-date", HeaderValue::from_str(&rfc1123)?);
        headers.insert(
            "time-generated-field",
            HeaderValue::from_static(TIME_GENERATED_FIELD),
        );

        let res = self
            .http
            .post(self.uri())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|err| DeliveryError {
                stage: "request",
                status: None,
                detail: err.to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(DeliveryError {
                stage: "status",
                status: Some(status.as_u16()),
                detail,
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl FactorPublisher for LogAnalyticsClient {
    async fn publish(&self, body: String) -> anyhow::Result<()> {
        self.post_data(body, Utc::now()).await
    }
}
