use crate::config::ScoringConfig;
use crate::error::{GuardrailError, Result};
use crate::finding::Finding;
use crate::normalize;
use crate::registry::RuleRegistry;
use crate::rule::RuleCard;
use crate::scorer::{dedup_normalized, PracticeEvidence, PracticeScore, Scorer};
use crate::taxonomy::{PracticeDescriptor, Taxonomy};
use crate::types::ComplianceStatus;
use serde::{Deserialize, Serialize};

/// Languages the configured scanner adapters can assess.
pub const SUPPORTED_LANGUAGES: &[&str] =
    &["python", "javascript", "typescript", "go", "java", "rust"];

pub fn is_supported_language(language: &str) -> bool {
    SUPPORTED_LANGUAGES
        .iter()
        .any(|l| l.eq_ignore_ascii_case(language))
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub practice_id: String,
    pub practice_name: String,
    pub language: String,
    #[serde(default)]
    pub code_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub practice_id: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technical_findings: Vec<Finding>,
    pub compliance_score: Option<u32>,
    pub status: ComplianceStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl ValidationResponse {
    fn from_score(score: PracticeScore, language: &str) -> Self {
        Self {
            practice_id: score.practice_id,
            language: language.to_string(),
            technical_findings: score.contributing_findings,
            compliance_score: score.score,
            status: score.status,
            recommendations: score.recommendations,
        }
    }
}

// ---------------------------------------------------------------------------
// Assessor
// ---------------------------------------------------------------------------

/// Wires the registry, taxonomy, and scorer together at the system
/// boundary. Holds only read references; independent assessments can share
/// one registry and taxonomy across threads.
pub struct Assessor<'a> {
    registry: &'a RuleRegistry,
    taxonomy: &'a Taxonomy,
    scorer: Scorer,
}

impl<'a> Assessor<'a> {
    pub fn new(registry: &'a RuleRegistry, taxonomy: &'a Taxonomy, config: &ScoringConfig) -> Self {
        Self {
            registry,
            taxonomy,
            scorer: Scorer::new(config),
        }
    }

    /// Cards whose domain or topic tag falls in the practice's expected
    /// rule categories, in registry order.
    pub fn matched_rules(&self, practice: &PracticeDescriptor) -> Vec<&'a RuleCard> {
        self.registry.filter(|c| {
            practice
                .expected_rule_categories
                .contains(&c.domain().to_lowercase())
                || practice
                    .expected_rule_categories
                    .contains(&c.topic().to_lowercase())
        })
    }

    /// Assess one practice from raw scanner reports and evidence.
    ///
    /// `reports` pairs a tool name with its raw output. A report that can't
    /// be normalized (unknown tool, malformed payload) is skipped with an
    /// explicit note in the recommendations; scoring proceeds with reduced
    /// coverage rather than fabricating findings.
    pub fn assess(
        &self,
        request: &ValidationRequest,
        reports: &[(String, String)],
        evidence: &PracticeEvidence,
    ) -> Result<ValidationResponse> {
        let practice = self.taxonomy.resolve(&request.practice_id)?;

        if !is_supported_language(&request.language) {
            let score = PracticeScore::not_applicable(&practice.practice_id, &request.language);
            return Ok(ValidationResponse::from_score(score, &request.language));
        }

        if request.code_paths.is_empty() {
            let score = PracticeScore::no_input(&practice.practice_id);
            return Ok(ValidationResponse::from_score(score, &request.language));
        }

        let mut findings: Vec<Finding> = Vec::new();
        let mut skip_notes: Vec<String> = Vec::new();
        for (tool, raw) in reports {
            match normalize::normalize(raw, tool) {
                Ok(normalized) => findings.extend(normalized),
                Err(e @ GuardrailError::UnsupportedTool(_))
                | Err(e @ GuardrailError::Parse { .. }) => {
                    tracing::warn!(tool = %tool, error = %e, "skipping scanner report");
                    skip_notes.push(format!("Report from '{tool}' was not usable: {e}"));
                }
                Err(e) => return Err(e),
            }
        }

        let matched = self.matched_rules(practice);
        let mut score =
            self.scorer
                .score(&practice.practice_id, &findings, &matched, evidence);
        if !skip_notes.is_empty() {
            score.recommendations.extend(skip_notes);
            score.recommendations = dedup_normalized(std::mem::take(&mut score.recommendations));
        }

        Ok(ValidationResponse::from_score(score, &request.language))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::TestOutcome;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_card(dir: &Path, name: &str, id: &str, severity: &str) {
        let body = format!(
            "id: {id}\ntitle: Rule {id}\nseverity: {severity}\nscope: any\n\
             requirement: Some requirement.\nrefs:\n  cwe:\n    - CWE-89\n"
        );
        std::fs::write(dir.join(name), body).unwrap();
    }

    fn fixture() -> (TempDir, RuleRegistry, Taxonomy, ScoringConfig) {
        let dir = TempDir::new().unwrap();
        write_card(dir.path(), "a.yaml", "INJECTION-WEB-001", "critical");
        write_card(dir.path(), "b.yaml", "SECRETS-API-001", "critical");
        let reg = RuleRegistry::load(&[dir.path().to_path_buf()]).unwrap();
        (dir, reg, Taxonomy::builtin(), ScoringConfig::default())
    }

    fn request(practice_id: &str, language: &str, code_paths: &[&str]) -> ValidationRequest {
        ValidationRequest {
            practice_id: practice_id.to_string(),
            practice_name: String::new(),
            language: language.to_string(),
            code_paths: code_paths.iter().map(|s| s.to_string()).collect(),
            context: None,
        }
    }

    fn evidence() -> PracticeEvidence {
        PracticeEvidence {
            secure_patterns_observed: 1,
            secure_patterns_expected: 1,
            security_tests: Some(TestOutcome {
                passing: 1,
                total: 1,
            }),
            documented_procedures: 1,
            required_procedures: 1,
        }
    }

    #[test]
    fn unknown_practice_is_an_error() {
        let (_dir, reg, tax, cfg) = fixture();
        let assessor = Assessor::new(&reg, &tax, &cfg);
        let err = assessor
            .assess(&request("ZZ.1", "python", &["src/"]), &[], &evidence())
            .unwrap_err();
        assert!(matches!(err, GuardrailError::UnknownPractice(_)));
    }

    #[test]
    fn unsupported_language_is_not_applicable() {
        let (_dir, reg, tax, cfg) = fixture();
        let assessor = Assessor::new(&reg, &tax, &cfg);
        let resp = assessor
            .assess(&request("PW.5", "cobol", &["src/"]), &[], &evidence())
            .unwrap();
        assert_eq!(resp.compliance_score, None);
        assert_eq!(resp.status, ComplianceStatus::NotApplicable);
        assert!(!resp.recommendations.is_empty());
    }

    #[test]
    fn empty_code_paths_is_non_compliant_zero() {
        let (_dir, reg, tax, cfg) = fixture();
        let assessor = Assessor::new(&reg, &tax, &cfg);
        let resp = assessor
            .assess(&request("PW.5", "python", &[]), &[], &evidence())
            .unwrap();
        assert_eq!(resp.compliance_score, Some(0));
        assert_eq!(resp.status, ComplianceStatus::NonCompliant);
        assert!(resp.recommendations[0].contains("input paths"));
    }

    #[test]
    fn bandit_report_scores_the_practice() {
        let (_dir, reg, tax, cfg) = fixture();
        let assessor = Assessor::new(&reg, &tax, &cfg);
        let raw = r#"{"results": [
            {"test_name": "hardcoded_sql_expressions", "issue_severity": "HIGH",
             "filename": "app/db.py", "line_number": 42,
             "issue_text": "Possible SQL injection vector"}
        ]}"#;
        let resp = assessor
            .assess(
                &request("PW.5", "python", &["app/"]),
                &[("bandit".to_string(), raw.to_string())],
                &evidence(),
            )
            .unwrap();
        // vulnerability = 90, rest 100 -> 0.4*90 + 60 = 96
        assert_eq!(resp.compliance_score, Some(96));
        assert_eq!(resp.status, ComplianceStatus::Compliant);
        assert_eq!(resp.technical_findings.len(), 1);
        assert_eq!(resp.technical_findings[0].nist_impact, "PW.5");
    }

    #[test]
    fn unusable_report_degrades_with_a_note() {
        let (_dir, reg, tax, cfg) = fixture();
        let assessor = Assessor::new(&reg, &tax, &cfg);
        let resp = assessor
            .assess(
                &request("PW.5", "python", &["app/"]),
                &[("grype".to_string(), "{}".to_string())],
                &evidence(),
            )
            .unwrap();
        // Scoring proceeds with reduced coverage; the skipped tool is noted.
        assert_eq!(resp.compliance_score, Some(100));
        assert!(resp
            .recommendations
            .iter()
            .any(|r| r.contains("grype")));
    }

    #[test]
    fn matched_rules_follow_expected_categories() {
        let (_dir, reg, tax, cfg) = fixture();
        let assessor = Assessor::new(&reg, &tax, &cfg);
        let pw5 = tax.resolve("PW.5").unwrap();
        let matched = assessor.matched_rules(pw5);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "INJECTION-WEB-001");

        let ps1 = tax.resolve("PS.1").unwrap();
        let matched = assessor.matched_rules(ps1);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "SECRETS-API-001");
    }
}
