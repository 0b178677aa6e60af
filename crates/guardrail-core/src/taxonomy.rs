use crate::error::{GuardrailError, Result};
use crate::types::PracticePhase;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ---------------------------------------------------------------------------
// PracticeDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeDescriptor {
    pub practice_id: String,
    pub name: String,
    pub phase: PracticePhase,
    pub sub_practices: Vec<String>,
    pub expected_rule_categories: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// The static practice taxonomy, resolved once at startup. No mutation API.
#[derive(Debug)]
pub struct Taxonomy {
    practices: Vec<PracticeDescriptor>,
    by_id: HashMap<String, usize>,
}

impl Taxonomy {
    /// Build a taxonomy from descriptors, enforcing the structural
    /// invariants: unique practice ids, and every sub-practice id prefixed
    /// by its parent practice id.
    pub fn from_descriptors(practices: Vec<PracticeDescriptor>) -> Result<Self> {
        let mut by_id = HashMap::new();
        for (i, p) in practices.iter().enumerate() {
            if by_id.insert(p.practice_id.clone(), i).is_some() {
                return Err(GuardrailError::Schema {
                    file: "<taxonomy>".to_string(),
                    message: format!("duplicate practice id '{}'", p.practice_id),
                });
            }
            for sub in &p.sub_practices {
                if !sub.starts_with(&format!("{}.", p.practice_id)) {
                    return Err(GuardrailError::Schema {
                        file: "<taxonomy>".to_string(),
                        message: format!(
                            "sub-practice '{}' does not belong to '{}'",
                            sub, p.practice_id
                        ),
                    });
                }
            }
        }
        Ok(Self { practices, by_id })
    }

    /// The built-in NIST SSDF practice set.
    pub fn builtin() -> Self {
        Self::from_descriptors(builtin_practices())
            .expect("builtin taxonomy must satisfy its own invariants")
    }

    pub fn resolve(&self, practice_id: &str) -> Result<&PracticeDescriptor> {
        self.by_id
            .get(practice_id)
            .map(|&i| &self.practices[i])
            .ok_or_else(|| GuardrailError::UnknownPractice(practice_id.to_string()))
    }

    pub fn children(&self, practice_id: &str) -> Result<&[String]> {
        Ok(&self.resolve(practice_id)?.sub_practices)
    }

    pub fn practices(&self) -> &[PracticeDescriptor] {
        &self.practices
    }

    pub fn practices_in_phase(&self, phase: PracticePhase) -> Vec<&PracticeDescriptor> {
        self.practices.iter().filter(|p| p.phase == phase).collect()
    }

    pub fn phase_of(&self, practice_id: &str) -> Result<PracticePhase> {
        Ok(self.resolve(practice_id)?.phase)
    }
}

// ---------------------------------------------------------------------------
// Built-in practice table
// ---------------------------------------------------------------------------

fn practice(
    id: &str,
    name: &str,
    phase: PracticePhase,
    subs: &[&str],
    categories: &[&str],
) -> PracticeDescriptor {
    PracticeDescriptor {
        practice_id: id.to_string(),
        name: name.to_string(),
        phase,
        sub_practices: subs.iter().map(|s| format!("{id}.{s}")).collect(),
        expected_rule_categories: categories.iter().map(|s| s.to_string()).collect(),
    }
}

fn builtin_practices() -> Vec<PracticeDescriptor> {
    use PracticePhase::{Implementation, Planning};
    vec![
        practice(
            "PO.1",
            "Define Security Requirements for Software Development",
            Planning,
            &["1", "2", "3"],
            &["process", "requirements"],
        ),
        practice(
            "PO.3",
            "Implement Supporting Toolchains",
            Planning,
            &["1", "2", "3"],
            &["tooling", "automation"],
        ),
        practice(
            "PO.5",
            "Implement and Maintain Secure Environments",
            Planning,
            &["1", "2"],
            &["environment", "secrets"],
        ),
        practice(
            "PS.1",
            "Protect All Forms of Code from Unauthorized Access and Tampering",
            Planning,
            &["1"],
            &["secrets", "access-control"],
        ),
        practice(
            "PS.2",
            "Provide a Mechanism for Verifying Software Release Integrity",
            Planning,
            &["1"],
            &["integrity", "supply-chain"],
        ),
        practice(
            "PS.3",
            "Archive and Protect Each Software Release",
            Planning,
            &["1", "2"],
            &["release", "supply-chain"],
        ),
        practice(
            "PW.1",
            "Design Software to Meet Security Requirements and Mitigate Risks",
            Implementation,
            &["1", "2", "3"],
            &["design", "threat-modeling"],
        ),
        practice(
            "PW.2",
            "Review the Software Design",
            Implementation,
            &["1"],
            &["design", "review"],
        ),
        practice(
            "PW.4",
            "Reuse Existing, Well-Secured Software",
            Implementation,
            &["1", "4"],
            &["dependencies", "supply-chain"],
        ),
        practice(
            "PW.5",
            "Create Source Code by Adhering to Secure Coding Practices",
            Implementation,
            &["1"],
            &["injection", "validation", "crypto"],
        ),
        practice(
            "PW.6",
            "Configure the Compilation, Interpreter, and Build Processes",
            Implementation,
            &["1", "2"],
            &["build", "hardening"],
        ),
        practice(
            "PW.7",
            "Review and/or Analyze Human-Readable Code",
            Implementation,
            &["1", "2"],
            &["review", "sast"],
        ),
        practice(
            "PW.8",
            "Test Executable Code to Identify Vulnerabilities",
            Implementation,
            &["1", "2"],
            &["testing", "dast"],
        ),
        practice(
            "PW.9",
            "Configure Software to Have Secure Settings by Default",
            Implementation,
            &["1", "2"],
            &["configuration", "hardening"],
        ),
        practice(
            "RV.1",
            "Identify and Confirm Vulnerabilities on an Ongoing Basis",
            Implementation,
            &["1", "2", "3"],
            &["monitoring", "scanning"],
        ),
        practice(
            "RV.2",
            "Assess, Prioritize, and Remediate Vulnerabilities",
            Implementation,
            &["1", "2"],
            &["remediation", "triage"],
        ),
        practice(
            "RV.3",
            "Analyze Vulnerabilities to Identify Their Root Causes",
            Implementation,
            &["1", "2", "3", "4"],
            &["root-cause", "process"],
        ),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
