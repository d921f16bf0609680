use clap::Parser;
use factorgate_core::checkpoint::{
    CheckpointKey, CheckpointStore, DocumentCheckpointStore, FileStateBackend,
};
use factorgate_core::collector::LogAnalyticsClient;
use factorgate_core::provider::{Company, FactorFetch, HttpCompany};
use factorgate_core::writer::FactorWriter;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod roster;

const DEFAULT_CHECKPOINT_PATH: &str = "checkpoints.json";

#[derive(Debug, Parser)]
#[command(name = "factorgate_worker")]
struct Args {
    /// Path to the company roster JSON file.
    #[arg(long, default_value = "companies.json")]
    roster: std::path::PathBuf,

    /// Fetch and filter, but skip publishing and checkpoint writes.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = factorgate_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let roster = roster::load_roster(&args.roster)?;

    let checkpoint_path = settings
        .checkpoint_path
        .clone()
        .unwrap_or_else(|| DEFAULT_CHECKPOINT_PATH.to_string());
    let checkpoints: Arc<dyn CheckpointStore> = Arc::new(DocumentCheckpointStore::new(
        FileStateBackend::new(checkpoint_path),
    ));

    if args.dry_run {
        return dry_run(&settings, roster).await;
    }

    let publisher = Arc::new(LogAnalyticsClient::from_settings(&settings)?);

    let mut failures = 0usize;
    for entry in roster.companies {
        let company = Arc::new(HttpCompany::from_settings(&settings, entry.domain.clone())?);
        let mut config = entry.config;

        // A roster entry without an explicit from-date resumes from the
        // stored cursor.
        if config.from_date_factor.is_none() {
            let key = CheckpointKey {
                portfolio_id: config.portfolio_id.clone(),
                domain: entry.domain.clone(),
            };
            match checkpoints.load(&key).await {
                Ok(Some(cursor)) if !cursor.next_from_date.is_empty() => {
                    config.from_date_factor = Some(cursor.next_from_date);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        domain = %entry.domain,
                        error = %err,
                        "failed to read stored cursor; fetching without a from-date"
                    );
                }
            }
        }

        let writer = FactorWriter::new(company, publisher.clone(), checkpoints.clone());
        if let Err(err) = writer.write_factors(&config).await {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(domain = %entry.domain, error = %err, "factor cycle failed");
            failures += 1;
        }
    }

    anyhow::ensure!(failures == 0, "{failures} company cycle(s) failed");
    Ok(())
}

async fn dry_run(
    settings: &factorgate_core::config::Settings,
    roster: roster::Roster,
) -> anyhow::Result<()> {
    for entry in roster.companies {
        let company = HttpCompany::from_settings(settings, entry.domain.clone())?;
        match company.get_factors(&entry.config).await {
            Ok(FactorFetch::Records(records)) => {
                let changed = records.iter().filter(|r| r.has_change()).count();
                tracing::info!(
                    domain = %entry.domain,
                    fetched = records.len(),
                    changed,
                    dry_run = true,
                    "factor delta"
                );
            }
            Ok(FactorFetch::NoData) => {
                tracing::info!(domain = %entry.domain, dry_run = true, "no new factor data");
            }
            Err(err) => {
                tracing::error!(domain = %entry.domain, error = %err, "factor fetch failed");
            }
        }
    }
    Ok(())
}

fn init_sentry(
    settings: &factorgate_core::config::Settings,
) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
