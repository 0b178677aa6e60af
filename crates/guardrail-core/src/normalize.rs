use crate::error::{GuardrailError, Result};
use crate::finding::Finding;
use crate::types::Severity;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Scanner tools with a normalization adapter, keyed by tool identifier.
pub const SUPPORTED_TOOLS: &[&str] = &["bandit", "semgrep", "trufflehog", "pip-audit"];

pub fn is_supported_tool(tool: &str) -> bool {
    SUPPORTED_TOOLS.contains(&tool)
}

/// Convert one tool's raw report into normalized findings.
///
/// Output is deterministic: identical raw input and tool name produce an
/// identical sequence, ordered by first location then severity descending.
pub fn normalize(raw: &str, tool: &str) -> Result<Vec<Finding>> {
    let mut findings = match tool {
        "bandit" => normalize_bandit(raw)?,
        "semgrep" => normalize_semgrep(raw)?,
        "trufflehog" => normalize_trufflehog(raw)?,
        "pip-audit" => normalize_pip_audit(raw)?,
        _ => return Err(GuardrailError::UnsupportedTool(tool.to_string())),
    };
    findings.sort_by(Finding::normalized_cmp);
    Ok(findings)
}

fn parse_err(tool: &str, message: impl ToString) -> GuardrailError {
    GuardrailError::Parse {
        file: format!("<{tool} report>"),
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Collapse per-occurrence results into one Finding per (type, severity),
/// accumulating count and locations.
struct Aggregator<'a> {
    tool: &'a str,
    groups: BTreeMap<(String, u8), Group>,
}

struct Group {
    severity: Severity,
    nist_impact: String,
    locations: Vec<String>,
    remediation: Option<String>,
}

impl<'a> Aggregator<'a> {
    fn new(tool: &'a str) -> Self {
        Self {
            tool,
            groups: BTreeMap::new(),
        }
    }

    fn add(
        &mut self,
        finding_type: &str,
        severity: Severity,
        nist_impact: &str,
        location: String,
        remediation: Option<&str>,
    ) {
        let group = self
            .groups
            .entry((finding_type.to_string(), severity.rank()))
            .or_insert_with(|| Group {
                severity,
                nist_impact: nist_impact.to_string(),
                locations: Vec::new(),
                remediation: remediation.map(str::to_string),
            });
        group.locations.push(location);
    }

    fn finish(self) -> Vec<Finding> {
        let tool = self.tool;
        self.groups
            .into_iter()
            .map(|((finding_type, _), mut group)| {
                group.locations.sort();
                Finding {
                    finding_type,
                    severity: group.severity,
                    count: group.locations.len() as u32,
                    locations: group.locations,
                    source_tool: tool.to_string(),
                    nist_impact: group.nist_impact,
                    remediation: group.remediation,
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// bandit (SAST)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BanditReport {
    #[serde(default)]
    results: Vec<BanditResult>,
}

#[derive(Deserialize)]
struct BanditResult {
    test_name: String,
    issue_severity: String,
    filename: String,
    line_number: u32,
    #[serde(default)]
    issue_text: String,
}

/// bandit test names whose findings are secret-handling problems, scored
/// against code-protection rather than secure-coding.
const BANDIT_SECRET_TESTS: &[&str] = &[
    "hardcoded_password_string",
    "hardcoded_password_funcarg",
    "hardcoded_password_default",
];

fn normalize_bandit(raw: &str) -> Result<Vec<Finding>> {
    let report: BanditReport =
        serde_json::from_str(raw).map_err(|e| parse_err("bandit", e))?;

    let mut agg = Aggregator::new("bandit");
    for r in &report.results {
        let severity = match r.issue_severity.to_ascii_uppercase().as_str() {
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            other => return Err(parse_err("bandit", format!("unknown severity '{other}'"))),
        };
        let impact = if BANDIT_SECRET_TESTS.contains(&r.test_name.as_str()) {
            "PS.1"
        } else {
            "PW.5"
        };
        let remediation = if r.issue_text.is_empty() {
            None
        } else {
            Some(r.issue_text.as_str())
        };
        agg.add(
            &r.test_name,
            severity,
            impact,
            format!("{}:{}", r.filename, r.line_number),
            remediation,
        );
    }
    Ok(agg.finish())
}

// ---------------------------------------------------------------------------
// semgrep (SAST)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SemgrepReport {
    #[serde(default)]
    results: Vec<SemgrepResult>,
}

#[derive(Deserialize)]
struct SemgrepResult {
    check_id: String,
    path: String,
    start: SemgrepPos,
    extra: SemgrepExtra,
}

#[derive(Deserialize)]
struct SemgrepPos {
    line: u32,
}

#[derive(Deserialize)]
struct SemgrepExtra {
    severity: String,
    #[serde(default)]
    message: String,
}

fn normalize_semgrep(raw: &str) -> Result<Vec<Finding>> {
    let report: SemgrepReport =
        serde_json::from_str(raw).map_err(|e| parse_err("semgrep", e))?;

    let mut agg = Aggregator::new("semgrep");
    for r in &report.results {
        let severity = match r.extra.severity.to_ascii_uppercase().as_str() {
            "ERROR" => Severity::High,
            "WARNING" => Severity::Medium,
            "INFO" => Severity::Low,
            other => return Err(parse_err("semgrep", format!("unknown severity '{other}'"))),
        };
        // The rule name is the last dotted segment of the check id.
        let finding_type = r.check_id.rsplit('.').next().unwrap_or(&r.check_id);
        let remediation = if r.extra.message.is_empty() {
            None
        } else {
            Some(r.extra.message.as_str())
        };
        agg.add(
            finding_type,
            severity,
            "PW.5",
            format!("{}:{}", r.path, r.start.line),
            remediation,
        );
    }
    Ok(agg.finish())
}

// ---------------------------------------------------------------------------
// trufflehog (secrets, JSONL)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TrufflehogRecord {
    #[serde(rename = "DetectorName")]
    detector_name: String,
    #[serde(rename = "Verified", default)]
    verified: bool,
    #[serde(rename = "SourceMetadata", default)]
    source_metadata: Option<TrufflehogSource>,
}

#[derive(Deserialize, Default)]
struct TrufflehogSource {
    #[serde(rename = "Data", default)]
    data: Option<TrufflehogData>,
}

#[derive(Deserialize, Default)]
struct TrufflehogData {
    #[serde(rename = "Filesystem", default)]
    filesystem: Option<TrufflehogFilesystem>,
}

#[derive(Deserialize, Default)]
struct TrufflehogFilesystem {
    #[serde(default)]
    file: String,
    #[serde(default)]
    line: u32,
}

const SECRET_REMEDIATION: &str =
    "Rotate the exposed credential and load it from a secrets manager";

fn normalize_trufflehog(raw: &str) -> Result<Vec<Finding>> {
    let mut agg = Aggregator::new("trufflehog");
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let record: TrufflehogRecord =
            serde_json::from_str(line).map_err(|e| parse_err("trufflehog", e))?;
        // A verified secret is live; an unverified one is still an exposure.
        let severity = if record.verified {
            Severity::Critical
        } else {
            Severity::High
        };
        let location = record
            .source_metadata
            .and_then(|s| s.data)
            .and_then(|d| d.filesystem)
            .map(|f| format!("{}:{}", f.file, f.line))
            .unwrap_or_else(|| "<unknown>".to_string());
        let finding_type = format!("secret_{}", record.detector_name.to_lowercase());
        agg.add(
            &finding_type,
            severity,
            "PS.1",
            location,
            Some(SECRET_REMEDIATION),
        );
    }
    Ok(agg.finish())
}

// ---------------------------------------------------------------------------
// pip-audit (dependencies)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PipAuditReport {
    #[serde(default)]
    dependencies: Vec<PipAuditDep>,
}

#[derive(Deserialize)]
struct PipAuditDep {
    name: String,
    version: String,
    #[serde(default)]
    vulns: Vec<PipAuditVuln>,
}

#[derive(Deserialize)]
struct PipAuditVuln {
    #[allow(dead_code)]
    id: String,
    #[serde(default)]
    fix_versions: Vec<String>,
}

fn normalize_pip_audit(raw: &str) -> Result<Vec<Finding>> {
    let report: PipAuditReport =
        serde_json::from_str(raw).map_err(|e| parse_err("pip-audit", e))?;

    let mut findings: Vec<Finding> = report
        .dependencies
        .iter()
        .filter(|d| !d.vulns.is_empty())
        .map(|d| {
            let remediation = d
                .vulns
                .iter()
                .flat_map(|v| v.fix_versions.first())
                .next()
                .map(|fix| format!("Upgrade {} to {}", d.name, fix));
            Finding {
                finding_type: "vulnerable_dependency".to_string(),
                severity: Severity::High,
                count: d.vulns.len() as u32,
                locations: vec![format!("{}=={}", d.name, d.version)],
                source_tool: "pip-audit".to_string(),
                nist_impact: "PW.4".to_string(),
                remediation,
            }
        })
        .collect();
    findings.sort_by(Finding::normalized_cmp);
    Ok(findings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BANDIT_RAW: &str = r#"{
        "results": [
            {"test_name": "hardcoded_sql_expressions", "issue_severity": "HIGH",
             "filename": "app/db.py", "line_number": 42,
             "issue_text": "Possible SQL injection vector"},
            {"test_name": "hardcoded_sql_expressions", "issue_severity": "HIGH",
             "filename": "app/api.py", "line_number": 7,
             "issue_text": "Possible SQL injection vector"},
            {"test_name": "hardcoded_password_string", "issue_severity": "LOW",
             "filename": "settings.py", "line_number": 3,
             "issue_text": "Possible hardcoded password"}
        ]
    }"#;

    #[test]
    fn bandit_groups_by_type_and_maps_impact() {
        let findings = normalize(BANDIT_RAW, "bandit").unwrap();
        assert_eq!(findings.len(), 2);

        let sql = findings
            .iter()
            .find(|f| f.finding_type == "hardcoded_sql_expressions")
            .unwrap();
        assert_eq!(sql.count, 2);
        assert_eq!(sql.severity, Severity::High);
        assert_eq!(sql.nist_impact, "PW.5");
        assert_eq!(sql.locations, vec!["app/api.py:7", "app/db.py:42"]);

        let pw = findings
            .iter()
            .find(|f| f.finding_type == "hardcoded_password_string")
            .unwrap();
        assert_eq!(pw.nist_impact, "PS.1");
    }

    #[test]
    fn bandit_unknown_severity_is_parse_error() {
        let raw = r#"{"results": [{"test_name": "x", "issue_severity": "SEVERE",
                       "filename": "a.py", "line_number": 1}]}"#;
        let err = normalize(raw, "bandit").unwrap_err();
        assert!(matches!(err, GuardrailError::Parse { .. }));
    }

    #[test]
    fn semgrep_maps_severities() {
        let raw = r#"{"results": [
            {"check_id": "python.lang.security.audit.dangerous-subprocess-use",
             "path": "run.py", "start": {"line": 10},
             "extra": {"severity": "ERROR", "message": "Avoid shell=True"}},
            {"check_id": "python.lang.best-practice.open-never-closed",
             "path": "io_util.py", "start": {"line": 3},
             "extra": {"severity": "WARNING", "message": ""}}
        ]}"#;
        let findings = normalize(raw, "semgrep").unwrap();
        assert_eq!(findings.len(), 2);

        let sub = findings
            .iter()
            .find(|f| f.finding_type == "dangerous-subprocess-use")
            .unwrap();
        assert_eq!(sub.severity, Severity::High);
        assert_eq!(sub.remediation.as_deref(), Some("Avoid shell=True"));

        let open = findings
            .iter()
            .find(|f| f.finding_type == "open-never-closed")
            .unwrap();
        assert_eq!(open.severity, Severity::Medium);
        assert!(open.remediation.is_none());
    }

    #[test]
    fn trufflehog_verified_is_critical() {
        let raw = concat!(
            r#"{"DetectorName": "AWS", "Verified": true, "SourceMetadata": {"Data": {"Filesystem": {"file": "config.py", "line": 3}}}}"#,
            "\n",
            r#"{"DetectorName": "Github", "Verified": false, "SourceMetadata": {"Data": {"Filesystem": {"file": "ci.yml", "line": 12}}}}"#,
            "\n"
        );
        let findings = normalize(raw, "trufflehog").unwrap();
        assert_eq!(findings.len(), 2);

        let aws = findings
            .iter()
            .find(|f| f.finding_type == "secret_aws")
            .unwrap();
        assert_eq!(aws.severity, Severity::Critical);
        assert_eq!(aws.nist_impact, "PS.1");
        assert_eq!(aws.locations, vec!["config.py:3"]);

        let gh = findings
            .iter()
            .find(|f| f.finding_type == "secret_github")
            .unwrap();
        assert_eq!(gh.severity, Severity::High);
    }

    #[test]
    fn pip_audit_one_finding_per_vulnerable_dependency() {
        let raw = r#"{"dependencies": [
            {"name": "flask", "version": "0.12",
             "vulns": [{"id": "PYSEC-2019-179", "fix_versions": ["1.0"]},
                        {"id": "PYSEC-2018-66", "fix_versions": []}]},
            {"name": "requests", "version": "2.31.0", "vulns": []}
        ]}"#;
        let findings = normalize(raw, "pip-audit").unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].finding_type, "vulnerable_dependency");
        assert_eq!(findings[0].count, 2);
        assert_eq!(findings[0].locations, vec!["flask==0.12"]);
        assert_eq!(findings[0].nist_impact, "PW.4");
        assert_eq!(findings[0].remediation.as_deref(), Some("Upgrade flask to 1.0"));
    }

    #[test]
    fn unknown_tool_is_unsupported() {
        let err = normalize("{}", "grype").unwrap_err();
        assert!(matches!(err, GuardrailError::UnsupportedTool(_)));
    }

    #[test]
    fn normalization_is_deterministic() {
        let first = normalize(BANDIT_RAW, "bandit").unwrap();
        let second = normalize(BANDIT_RAW, "bandit").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_report_is_parse_error() {
        let err = normalize("not json", "bandit").unwrap_err();
        assert!(matches!(err, GuardrailError::Parse { .. }));
    }
}
