use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// A single normalized observation from a scanner run. Created per scan,
/// consumed immediately by the scorer; never persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub finding_type: String,
    pub severity: Severity,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    pub source_tool: String,
    /// Practice id this finding counts against (e.g. "PW.5").
    pub nist_impact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Finding {
    /// Normalizer output order: first location ascending, then severity
    /// descending, then type for full determinism.
    pub fn normalized_cmp(&self, other: &Finding) -> Ordering {
        let self_loc = self.locations.first().map(String::as_str).unwrap_or("");
        let other_loc = other.locations.first().map(String::as_str).unwrap_or("");
        self_loc
            .cmp(other_loc)
            .then(self.severity.rank().cmp(&other.severity.rank()))
            .then(self.finding_type.cmp(&other.finding_type))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(loc: &str, severity: Severity, ty: &str) -> Finding {
        Finding {
            finding_type: ty.to_string(),
            severity,
            count: 1,
            locations: vec![loc.to_string()],
            source_tool: "bandit".to_string(),
            nist_impact: "PW.5".to_string(),
            remediation: None,
        }
    }

    #[test]
    fn ordering_is_location_then_severity() {
        let mut findings = vec![
            finding("b.py:1", Severity::Critical, "x"),
            finding("a.py:9", Severity::Low, "y"),
            finding("a.py:9", Severity::High, "z"),
        ];
        findings.sort_by(Finding::normalized_cmp);
        assert_eq!(findings[0].locations[0], "a.py:9");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[1].severity, Severity::Low);
        assert_eq!(findings[2].locations[0], "b.py:1");
    }

    #[test]
    fn json_roundtrip() {
        let f = Finding {
            finding_type: "sql_injection".to_string(),
            severity: Severity::High,
            count: 2,
            locations: vec!["app/db.py:42".to_string()],
            source_tool: "bandit".to_string(),
            nist_impact: "PW.5".to_string(),
            remediation: Some("Use parameterized queries".to_string()),
        };
        let json = serde_json::to_string(&f).unwrap();
        let parsed: Finding = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, f);
    }
}
