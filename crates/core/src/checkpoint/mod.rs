mod document;

pub use document::{DocumentCheckpointStore, FileStateBackend, InMemoryStateBackend, StateBackend};

use anyhow::Context;
use chrono::NaiveDate;

/// Identifies one checkpoint slot: a company domain, optionally scoped to a
/// portfolio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointKey {
    pub portfolio_id: Option<String>,
    pub domain: String,
}

impl CheckpointKey {
    pub fn flat(domain: impl Into<String>) -> Self {
        Self {
            portfolio_id: None,
            domain: domain.into(),
        }
    }

    pub fn in_portfolio(portfolio_id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            portfolio_id: Some(portfolio_id.into()),
            domain: domain.into(),
        }
    }
}

/// Resumption cursor, stored as `"<next_from_date>|<last_run_date>"`.
///
/// Both components are kept as the strings they were written with so a stored
/// cursor reads back byte-exact. `next_from_date` is empty when a quiet
/// company has never produced data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub next_from_date: String,
    pub last_run_date: String,
}

impl Cursor {
    pub fn new(next_from_date: impl Into<String>, run_date: NaiveDate) -> Self {
        Self {
            next_from_date: next_from_date.into(),
            last_run_date: run_date.to_string(),
        }
    }

    /// Derives the cursor that follows a batch whose last observation carries
    /// `date_today`: the observation date plus one day, paired with today's
    /// run date.
    pub fn advance_from(date_today: &str, today: NaiveDate) -> anyhow::Result<Self> {
        let day = date_today
            .get(..10)
            .with_context(|| format!("dateToday {date_today:?} is shorter than an ISO date"))?;
        let observed = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .with_context(|| format!("dateToday {date_today:?} does not start with a date"))?;
        let next = observed
            .succ_opt()
            .with_context(|| format!("observation date {observed} is out of range"))?;
        Ok(Self::new(next.to_string(), today))
    }

    pub fn decode(raw: &str) -> anyhow::Result<Self> {
        let (from, run) = raw
            .split_once('|')
            .with_context(|| format!("checkpoint cursor {raw:?} is not '<from>|<run>'"))?;
        Ok(Self {
            next_from_date: from.to_string(),
            last_run_date: run.to_string(),
        })
    }

    pub fn encode(&self) -> String {
        format!("{}|{}", self.next_from_date, self.last_run_date)
    }
}

/// Checkpoint persistence capability the writer depends on. Implementations
/// must make `upsert` atomic per key, whatever the backing document looks
/// like.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, key: &CheckpointKey) -> anyhow::Result<Option<Cursor>>;

    async fn upsert(&self, key: &CheckpointKey, cursor: &Cursor) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips_byte_exact() {
        let raw = "2024-01-06|2024-02-01";
        let cursor = Cursor::decode(raw).unwrap();
        assert_eq!(cursor.encode(), raw);

        // Odd but legal component values are preserved verbatim.
        let raw = "|2024-02-01";
        assert_eq!(Cursor::decode(raw).unwrap().encode(), raw);
    }

    #[test]
    fn decode_rejects_missing_separator() {
        assert!(Cursor::decode("2024-01-06").is_err());
    }

    #[test]
    fn advance_uses_day_after_last_observation() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let cursor = Cursor::advance_from("2024-01-05T00:00:00Z", today).unwrap();
        assert_eq!(cursor.encode(), "2024-01-06|2024-02-01");
    }

    #[test]
    fn advance_rolls_over_month_and_leap_day() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let cursor = Cursor::advance_from("2024-01-31T12:00:00Z", today).unwrap();
        assert_eq!(cursor.next_from_date, "2024-02-01");

        let cursor = Cursor::advance_from("2024-02-28T12:00:00Z", today).unwrap();
        assert_eq!(cursor.next_from_date, "2024-02-29");
    }

    #[test]
    fn advance_rejects_malformed_observation_dates() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(Cursor::advance_from("garbage", today).is_err());
        assert!(Cursor::advance_from("2024-13-05T00:00:00Z", today).is_err());
    }
}
