use crate::checkpoint::{CheckpointKey, CheckpointStore, Cursor};
use crate::collector::FactorPublisher;
use crate::domain::config::WriteConfig;
use crate::provider::{Company, FactorFetch};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;

const INDUSTRY_FALLBACK: &str = "NA";

/// Runs one checkpointed delta-forwarding cycle for one company: fetch the
/// factor delta, filter and annotate it, deliver the batch, persist the next
/// cursor.
pub struct FactorWriter {
    company: Arc<dyn Company>,
    publisher: Arc<dyn FactorPublisher>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl FactorWriter {
    pub fn new(
        company: Arc<dyn Company>,
        publisher: Arc<dyn FactorPublisher>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            company,
            publisher,
            checkpoints,
        }
    }

    pub async fn write_factors(&self, config: &WriteConfig) -> anyhow::Result<()> {
        self.write_factors_at(config, Utc::now().date_naive()).await
    }

    pub async fn write_factors_at(
        &self,
        config: &WriteConfig,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let records = match self.company.get_factors(config).await? {
            FactorFetch::NoData => {
                tracing::warn!(
                    domain = %self.company.domain(),
                    "no new factor data; advancing run date only"
                );
                self.save_checkpoint_at(config, today).await;
                return Ok(());
            }
            FactorFetch::Records(records) => records,
        };

        // An empty batch means the window is already drained; leave the
        // checkpoint exactly as it is.
        let Some(last) = records.last() else {
            return Ok(());
        };

        // Derive the cursor up front: a batch we cannot checkpoint must not be
        // delivered, or the same records would be re-sent on the next run.
        let cursor = match Cursor::advance_from(&last.date_today, today) {
            Ok(cursor) => cursor,
            Err(err) => {
                tracing::error!(
                    domain = %self.company.domain(),
                    error = %err,
                    "cannot derive next checkpoint cursor; skipping this cycle"
                );
                return Ok(());
            }
        };

        let override_all = config.diff_override();

        let industry = match self.company.get_industry_name().await {
            Ok(industry) => industry,
            Err(err) => {
                tracing::error!(
                    domain = %self.company.domain(),
                    error = %err,
                    "industry lookup failed"
                );
                INDUSTRY_FALLBACK.to_string()
            }
        };

        let severity = config.level_factor_change.as_deref().unwrap_or("NA");
        let portfolio_id = config.portfolio_id.as_deref().unwrap_or("NA");
        let portfolio_name = config.portfolio_name.as_deref().unwrap_or("NA");

        let batch: Vec<Value> = records
            .iter()
            .filter(|record| override_all || record.has_change())
            .map(|record| record.annotated(&industry, severity, portfolio_id, portfolio_name))
            .collect();

        let body =
            serde_json::to_string_pretty(&batch).context("failed to serialize factor batch")?;

        tracing::info!(
            domain = %self.company.domain(),
            fetched = records.len(),
            sent = batch.len(),
            "publishing factor batch"
        );
        self.publisher.publish(body).await?;

        let key = self.checkpoint_key(config);
        self.checkpoints.upsert(&key, &cursor).await?;
        tracing::info!(
            domain = %self.company.domain(),
            cursor = %cursor.encode(),
            "checkpoint saved"
        );
        Ok(())
    }

    pub async fn save_checkpoint(&self, config: &WriteConfig) {
        self.save_checkpoint_at(config, Utc::now().date_naive())
            .await
    }

    /// Best-effort checkpoint for a cycle that produced no data: the run date
    /// advances so a quiet company is not retried forever, the from-date is
    /// carried over from the config unchanged (empty if absent).
    pub async fn save_checkpoint_at(&self, config: &WriteConfig, today: NaiveDate) {
        let from_date = config.from_date_factor.clone().unwrap_or_default();
        let cursor = Cursor::new(from_date, today);
        let key = self.checkpoint_key(config);

        if let Err(err) = self.checkpoints.upsert(&key, &cursor).await {
            tracing::warn!(
                domain = %self.company.domain(),
                error = %err,
                "failed to save no-data checkpoint"
            );
            return;
        }
        tracing::info!(
            domain = %self.company.domain(),
            cursor = %cursor.encode(),
            "checkpoint saved without new data"
        );
    }

    fn checkpoint_key(&self, config: &WriteConfig) -> CheckpointKey {
        CheckpointKey {
            portfolio_id: config.portfolio_id.clone(),
            domain: self.company.domain().to_string(),
        }
    }
}
