use crate::config::{ScoringConfig, ScoringWeights, Thresholds};
use crate::error::Result;
use crate::finding::Finding;
use crate::rule::RuleCard;
use crate::taxonomy::Taxonomy;
use crate::types::{ComplianceStatus, PracticePhase, Severity};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passing: u32,
    pub total: u32,
}

/// Caller-supplied observations for the non-vulnerability components of a
/// practice score. `security_tests: None` means no tests were run for this
/// practice, which propagates `status = incomplete`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeEvidence {
    #[serde(default)]
    pub secure_patterns_observed: u32,
    #[serde(default)]
    pub secure_patterns_expected: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_tests: Option<TestOutcome>,
    #[serde(default)]
    pub documented_procedures: u32,
    #[serde(default)]
    pub required_procedures: u32,
}

// ---------------------------------------------------------------------------
// ComponentScores
// ---------------------------------------------------------------------------

/// The four component scores behind a final score, kept on the output so a
/// reader can see where points were lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub vulnerability: f64,
    pub pattern: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<f64>,
    pub process: f64,
}

// ---------------------------------------------------------------------------
// PracticeScore
// ---------------------------------------------------------------------------

/// Scorer output for one practice. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeScore {
    pub practice_id: String,
    pub score: Option<u32>,
    pub status: ComplianceStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributing_findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentScores>,
}

impl PracticeScore {
    /// No code or input found for the practice's scope: assessed, and
    /// non-compliant, with a pointer at the likely misconfiguration.
    pub fn no_input(practice_id: &str) -> Self {
        Self {
            practice_id: practice_id.to_string(),
            score: Some(0),
            status: ComplianceStatus::NonCompliant,
            contributing_findings: Vec::new(),
            recommendations: vec![
                "No code or input found for this practice's scope; verify the configured input paths".to_string(),
            ],
            components: None,
        }
    }

    /// Language or tooling unsupported: not assessed at all.
    pub fn not_applicable(practice_id: &str, language: &str) -> Self {
        Self {
            practice_id: practice_id.to_string(),
            score: None,
            status: ComplianceStatus::NotApplicable,
            contributing_findings: Vec::new(),
            recommendations: vec![format!(
                "Language '{language}' is not supported by the configured scanners; manual review required"
            )],
            components: None,
        }
    }

    /// Assessment could not complete (e.g. scanner timeout). Distinct from
    /// "assessed and non-compliant".
    pub fn incomplete(practice_id: &str, reason: impl Into<String>) -> Self {
        Self {
            practice_id: practice_id.to_string(),
            score: None,
            status: ComplianceStatus::Incomplete,
            contributing_findings: Vec::new(),
            recommendations: vec![reason.into()],
            components: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

pub struct Scorer {
    weights: ScoringWeights,
    thresholds: Thresholds,
}

impl Scorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            weights: config.weights,
            thresholds: config.thresholds,
        }
    }

    /// Score one practice from findings, matched rules, and evidence.
    ///
    /// Pure: identical inputs yield an identical `PracticeScore`, which is
    /// what makes golden-output testing and re-scoring possible.
    pub fn score(
        &self,
        practice_id: &str,
        findings: &[Finding],
        matched_rules: &[&RuleCard],
        evidence: &PracticeEvidence,
    ) -> PracticeScore {
        let contributing: Vec<Finding> = findings
            .iter()
            .filter(|f| f.nist_impact == practice_id)
            .cloned()
            .collect();

        let penalty: u32 = contributing
            .iter()
            .map(|f| f.count * f.severity.penalty_points())
            .sum();
        let vulnerability = (100u32.saturating_sub(penalty)) as f64;

        let pattern = ratio_score(
            evidence.secure_patterns_observed,
            evidence.secure_patterns_expected,
        );
        let process = ratio_score(
            evidence.documented_procedures,
            evidence.required_procedures,
        );
        let test = evidence
            .security_tests
            .filter(|t| t.total > 0)
            .map(|t| ratio_score(t.passing, t.total));

        let components = ComponentScores {
            vulnerability,
            pattern,
            test,
            process,
        };

        let Some(test) = test else {
            return PracticeScore {
                practice_id: practice_id.to_string(),
                score: None,
                status: ComplianceStatus::Incomplete,
                recommendations: vec![format!(
                    "No security tests were run for {practice_id}; run the test suite and re-assess"
                )],
                contributing_findings: contributing,
                components: Some(components),
            };
        };

        let final_score = self.weights.vulnerability_impact * vulnerability
            + self.weights.pattern_compliance * pattern
            + self.weights.test_coverage * test
            + self.weights.process_compliance * process;
        let score = (final_score.round() as u32).min(100);
        let status = self.status_for(score);

        let recommendations = build_recommendations(&contributing, matched_rules, status);

        PracticeScore {
            practice_id: practice_id.to_string(),
            score: Some(score),
            status,
            contributing_findings: contributing,
            recommendations,
            components: Some(components),
        }
    }

    pub fn status_for(&self, score: u32) -> ComplianceStatus {
        if score >= self.thresholds.compliant {
            ComplianceStatus::Compliant
        } else if score >= self.thresholds.partial {
            ComplianceStatus::Partial
        } else {
            ComplianceStatus::NonCompliant
        }
    }
}

/// `100 * observed / expected`, clamped to [0, 100]. Zero expected counts
/// as fully covered (vacuously compliant).
fn ratio_score(observed: u32, expected: u32) -> f64 {
    if expected == 0 {
        return 100.0;
    }
    (100.0 * observed as f64 / expected as f64).clamp(0.0, 100.0)
}

fn build_recommendations(
    contributing: &[Finding],
    matched_rules: &[&RuleCard],
    status: ComplianceStatus,
) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();
    for f in contributing {
        if let Some(r) = &f.remediation {
            recommendations.push(r.clone());
        }
    }

    if status != ComplianceStatus::Compliant {
        let mut rules: Vec<&&RuleCard> = matched_rules.iter().collect();
        rules.sort_by(|a, b| {
            a.severity
                .rank()
                .cmp(&b.severity.rank())
                .then(a.id.cmp(&b.id))
        });
        for rule in rules.iter().take(3) {
            recommendations.push(format!("Apply '{}' ({})", rule.title, rule.id));
        }
    }

    dedup_normalized(recommendations)
}

/// Dedup by normalized text (trimmed, lowercased, whitespace collapsed),
/// keeping first occurrence order.
pub fn dedup_normalized(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let key = item
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if seen.insert(key) {
            out.push(item);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Overall aggregation
// ---------------------------------------------------------------------------

/// Cross-practice overall score: planning mean x 0.3 + implementation mean
/// x 0.7. Practices without a numeric score (not_applicable, incomplete)
/// are excluded from the means; a phase with no scored practices drops out
/// and its weight shifts to the other phase.
pub fn overall(scores: &[PracticeScore], taxonomy: &Taxonomy) -> Result<Option<f64>> {
    let mut planning: Vec<f64> = Vec::new();
    let mut implementation: Vec<f64> = Vec::new();

    for s in scores {
        let Some(score) = s.score else { continue };
        match taxonomy.phase_of(&s.practice_id)? {
            PracticePhase::Planning => planning.push(score as f64),
            PracticePhase::Implementation => implementation.push(score as f64),
        }
    }

    let planning_mean = mean(&planning);
    let implementation_mean = mean(&implementation);

    Ok(match (planning_mean, implementation_mean) {
        (Some(p), Some(i)) => Some(
            p * PracticePhase::Planning.overall_weight()
                + i * PracticePhase::Implementation.overall_weight(),
        ),
        (Some(p), None) => Some(p),
        (None, Some(i)) => Some(i),
        (None, None) => None,
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Maximum severity among a score's contributing findings, if any.
pub fn top_severity(score: &PracticeScore) -> Option<Severity> {
    score
        .contributing_findings
        .iter()
        .map(|f| f.severity)
        .min_by_key(|s| s.rank())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
