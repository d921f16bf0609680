use anyhow::Context;
use factorgate_core::domain::config::WriteConfig;
use serde::Deserialize;
use std::path::Path;

/// Companies to process in one run, each with its own cycle configuration.
#[derive(Debug, Deserialize)]
pub struct Roster {
    pub companies: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RosterEntry {
    pub domain: String,

    #[serde(flatten)]
    pub config: WriteConfig,
}

pub fn load_roster(path: &Path) -> anyhow::Result<Roster> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster {}", path.display()))?;
    let roster: Roster = serde_json::from_str(&raw)
        .with_context(|| format!("roster {} is not valid JSON", path.display()))?;

    anyhow::ensure!(!roster.companies.is_empty(), "roster has no companies");
    for entry in &roster.companies {
        anyhow::ensure!(
            !entry.domain.trim().is_empty(),
            "roster entry with empty domain"
        );
    }

    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_entries_with_cycle_config() {
        let roster: Roster = serde_json::from_value(json!({
            "companies": [
                {
                    "domain": "example.com",
                    "from_date_factor": "2024-01-01",
                    "diff_override_own_factor": "false",
                },
                {
                    "domain": "other.com",
                    "portfolioId": "p-1",
                    "portfolioName": "Portfolio One",
                },
            ]
        }))
        .unwrap();

        assert_eq!(roster.companies.len(), 2);
        assert_eq!(
            roster.companies[0].config.from_date_factor.as_deref(),
            Some("2024-01-01")
        );
        assert!(roster.companies[1].config.portfolio_scoped());
    }

    #[test]
    fn rejects_empty_roster_files() {
        let dir = std::env::temp_dir().join("factorgate-roster-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("companies.json");

        std::fs::write(&path, "{\"companies\": []}").unwrap();
        assert!(load_roster(&path).is_err());

        std::fs::write(&path, "{\"companies\": [{\"domain\": \"  \"}]}").unwrap();
        assert!(load_roster(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
