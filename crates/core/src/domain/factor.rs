use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One security-factor observation for a company, as returned by the scoring
/// provider. Provider-specific fields are carried through untouched in
/// `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorRecord {
    #[serde(rename = "dateToday")]
    pub date_today: String,

    /// Change indicator. Absent means the provider did not compute one; such
    /// records are treated as changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FactorRecord {
    pub fn has_change(&self) -> bool {
        self.diff.map_or(true, |d| d != 0.0)
    }

    /// Builds the outgoing collector record. The input is left untouched:
    /// annotation adds `industry`, `severity`, `portfolioId`, `portfolioName`
    /// and omits `diff`.
    pub fn annotated(
        &self,
        industry: &str,
        severity: &str,
        portfolio_id: &str,
        portfolio_name: &str,
    ) -> Value {
        let mut out = self.extra.clone();
        out.insert(
            "dateToday".to_string(),
            Value::String(self.date_today.clone()),
        );
        out.insert("industry".to_string(), Value::String(industry.to_string()));
        out.insert("severity".to_string(), Value::String(severity.to_string()));
        out.insert(
            "portfolioId".to_string(),
            Value::String(portfolio_id.to_string()),
        );
        out.insert(
            "portfolioName".to_string(),
            Value::String(portfolio_name.to_string()),
        );
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(diff: Option<f64>) -> FactorRecord {
        serde_json::from_value(json!({
            "dateToday": "2024-01-05T00:00:00Z",
            "diff": diff,
            "factorName": "dns_health",
            "score": 87,
        }))
        .unwrap()
    }

    #[test]
    fn absent_or_nonzero_diff_counts_as_changed() {
        assert!(record(Some(2.0)).has_change());
        assert!(record(Some(-1.0)).has_change());
        assert!(record(None).has_change());
        assert!(!record(Some(0.0)).has_change());
    }

    #[test]
    fn annotated_drops_diff_and_keeps_provider_fields() {
        let out = record(Some(2.0)).annotated("Tech", "NA", "NA", "NA");
        let obj = out.as_object().unwrap();
        assert!(obj.get("diff").is_none());
        assert_eq!(obj["dateToday"], json!("2024-01-05T00:00:00Z"));
        assert_eq!(obj["factorName"], json!("dns_health"));
        assert_eq!(obj["score"], json!(87));
        assert_eq!(obj["industry"], json!("Tech"));
        assert_eq!(obj["severity"], json!("NA"));
        assert_eq!(obj["portfolioId"], json!("NA"));
        assert_eq!(obj["portfolioName"], json!("NA"));
    }

    #[test]
    fn annotation_leaves_the_input_record_untouched() {
        let rec = record(Some(2.0));
        let _ = rec.annotated("Tech", "high", "p-1", "Portfolio One");
        assert_eq!(rec.diff, Some(2.0));
        assert!(rec.extra.get("industry").is_none());
    }
}
