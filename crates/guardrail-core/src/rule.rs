use crate::error::{GuardrailError, Result};
use crate::paths;
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// RuleCard
// ---------------------------------------------------------------------------

/// A single security requirement, immutable after load.
///
/// `detect` maps scanner tool names to tool-specific detector ids;
/// `refs` maps standard names (cwe/asvs/owasp/standards) to reference codes.
/// Both use `BTreeMap` so serialization order is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCard {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub scope: String,
    pub requirement: String,
    #[serde(rename = "do", default, skip_serializing_if = "Vec::is_empty")]
    pub dos: Vec<String>,
    #[serde(rename = "dont", default, skip_serializing_if = "Vec::is_empty")]
    pub donts: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detect: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify: Vec<String>,
    pub refs: BTreeMap<String, Vec<String>>,
}

impl RuleCard {
    /// The DOMAIN segment of the id (e.g. "SECRETS" in SECRETS-API-001).
    pub fn domain(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }

    /// The TOPIC segment of the id (e.g. "API" in SECRETS-API-001).
    pub fn topic(&self) -> &str {
        self.id.split('-').nth(1).unwrap_or(&self.id)
    }

    /// True if this card applies to the given language. A scope of
    /// `any` or `*` matches everything; otherwise the match is
    /// case-insensitive on the scope tag.
    pub fn applies_to_language(&self, language: &str) -> bool {
        self.scope == "any" || self.scope == "*" || self.scope.eq_ignore_ascii_case(language)
    }
}

// ---------------------------------------------------------------------------
// RawRuleCard
// ---------------------------------------------------------------------------

/// The loosely-typed shape of an authored rule-card YAML document.
///
/// Every field is optional at parse time; `validate` converts missing keys
/// and bad enum values into schema errors naming the offending file, rather
/// than letting serde surface them as opaque parse failures.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRuleCard {
    pub id: Option<String>,
    pub title: Option<String>,
    pub severity: Option<String>,
    pub scope: Option<String>,
    pub requirement: Option<String>,
    #[serde(rename = "do", default)]
    pub dos: Vec<String>,
    #[serde(rename = "dont", default)]
    pub donts: Vec<String>,
    #[serde(default)]
    pub detect: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub verify: Vec<String>,
    #[serde(default)]
    pub refs: BTreeMap<String, Vec<String>>,
}

impl RawRuleCard {
    pub fn validate(self, file: &str) -> Result<RuleCard> {
        let schema_err = |message: String| GuardrailError::Schema {
            file: file.to_string(),
            message,
        };

        let id = self
            .id
            .ok_or_else(|| schema_err("missing required field 'id'".to_string()))?;
        if !paths::is_valid_rule_id(&id) {
            return Err(schema_err(format!(
                "invalid rule id '{id}': expected DOMAIN-TOPIC-NNN"
            )));
        }

        let title = self
            .title
            .ok_or_else(|| schema_err("missing required field 'title'".to_string()))?;
        let severity_str = self
            .severity
            .ok_or_else(|| schema_err("missing required field 'severity'".to_string()))?;
        let severity = Severity::from_str(&severity_str)
            .map_err(|_| schema_err(format!("invalid severity '{severity_str}'")))?;
        let scope = self
            .scope
            .ok_or_else(|| schema_err("missing required field 'scope'".to_string()))?;
        let requirement = self
            .requirement
            .ok_or_else(|| schema_err("missing required field 'requirement'".to_string()))?;

        if self.refs.is_empty() || self.refs.values().all(|v| v.is_empty()) {
            return Err(schema_err(format!(
                "rule '{id}' must carry at least one reference in 'refs'"
            )));
        }

        Ok(RuleCard {
            id,
            title,
            severity,
            scope,
            requirement,
            dos: self.dos,
            donts: self.donts,
            detect: self.detect,
            verify: self.verify,
            refs: self.refs,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
