use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn all() -> &'static [Severity] {
        &[
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ]
    }

    /// Points deducted from a practice's vulnerability score per finding.
    pub fn penalty_points(self) -> u32 {
        match self {
            Severity::Critical => 20,
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 1,
        }
    }

    /// Sort rank: 0 is most severe. Bundle selection and gap ordering sort
    /// ascending on this.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = crate::error::GuardrailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(crate::error::GuardrailError::InvalidSeverity(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PracticePhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticePhase {
    Planning,
    Implementation,
}

impl PracticePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            PracticePhase::Planning => "planning",
            PracticePhase::Implementation => "implementation",
        }
    }

    /// Weight of this phase in the overall cross-practice score.
    pub fn overall_weight(self) -> f64 {
        match self {
            PracticePhase::Planning => 0.3,
            PracticePhase::Implementation => 0.7,
        }
    }
}

impl fmt::Display for PracticePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PracticePhase {
    type Err = crate::error::GuardrailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(PracticePhase::Planning),
            "implementation" => Ok(PracticePhase::Implementation),
            _ => Err(crate::error::GuardrailError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ComplianceStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    Partial,
    NonCompliant,
    NotApplicable,
    Incomplete,
}

impl ComplianceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::Partial => "partial",
            ComplianceStatus::NonCompliant => "non_compliant",
            ComplianceStatus::NotApplicable => "not_applicable",
            ComplianceStatus::Incomplete => "incomplete",
        }
    }

    /// True for the two sentinel statuses that bypass threshold scoring.
    pub fn is_sentinel(self) -> bool {
        matches!(
            self,
            ComplianceStatus::NotApplicable | ComplianceStatus::Incomplete
        )
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn severity_penalty_points() {
        assert_eq!(Severity::Critical.penalty_points(), 20);
        assert_eq!(Severity::High.penalty_points(), 10);
        assert_eq!(Severity::Medium.penalty_points(), 5);
        assert_eq!(Severity::Low.penalty_points(), 1);
    }

    #[test]
    fn severity_rank_orders_critical_first() {
        assert!(Severity::Critical.rank() < Severity::High.rank());
        assert!(Severity::High.rank() < Severity::Medium.rank());
        assert!(Severity::Medium.rank() < Severity::Low.rank());
    }

    #[test]
    fn severity_roundtrip() {
        for &sev in Severity::all() {
            let parsed = Severity::from_str(sev.as_str()).unwrap();
            assert_eq!(parsed, sev);
        }
        assert!(Severity::from_str("catastrophic").is_err());
    }

    #[test]
    fn severity_serde_snake_case() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Severity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, Severity::High);
    }

    #[test]
    fn phase_weights_sum_to_one() {
        let total = PracticePhase::Planning.overall_weight()
            + PracticePhase::Implementation.overall_weight();
        assert!((total - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn phase_roundtrip() {
        assert_eq!(
            PracticePhase::from_str("planning").unwrap(),
            PracticePhase::Planning
        );
        assert_eq!(
            PracticePhase::from_str("implementation").unwrap(),
            PracticePhase::Implementation
        );
        assert!(PracticePhase::from_str("design").is_err());
    }

    #[test]
    fn status_sentinels() {
        assert!(ComplianceStatus::NotApplicable.is_sentinel());
        assert!(ComplianceStatus::Incomplete.is_sentinel());
        assert!(!ComplianceStatus::Compliant.is_sentinel());
        assert!(!ComplianceStatus::NonCompliant.is_sentinel());
    }

    #[test]
    fn status_serde_snake_case() {
        let json = serde_json::to_string(&ComplianceStatus::NonCompliant).unwrap();
        assert_eq!(json, "\"non_compliant\"");
    }
}
