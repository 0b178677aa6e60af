use crate::error::{GuardrailError, Result};
use crate::rule::{RawRuleCard, RuleCard};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// LoadFailure
// ---------------------------------------------------------------------------

/// A rule-card file that failed to parse or validate. Contained: the rest of
/// the registry still loads, and callers can report these alongside results.
#[derive(Debug, Clone, Serialize)]
pub struct LoadFailure {
    pub file: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// RuleRegistry
// ---------------------------------------------------------------------------

/// The loaded, immutable set of rule cards.
///
/// Cards keep file-load order (files are discovered by a sorted walk, one
/// card per file). Duplicate ids and an empty result set are structural
/// errors that fail the whole load; everything else is contained per file.
#[derive(Debug)]
pub struct RuleRegistry {
    rules: Vec<RuleCard>,
    by_id: HashMap<String, usize>,
    failures: Vec<LoadFailure>,
}

impl RuleRegistry {
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let files = collect_rule_files(paths)?;

        let mut rules: Vec<RuleCard> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut failures: Vec<LoadFailure> = Vec::new();

        for file in &files {
            let file_display = file.display().to_string();
            match load_card(file) {
                Ok(card) => {
                    if by_id.contains_key(&card.id) {
                        return Err(GuardrailError::Schema {
                            file: file_display,
                            message: format!("duplicate rule id '{}'", card.id),
                        });
                    }
                    by_id.insert(card.id.clone(), rules.len());
                    rules.push(card);
                }
                Err(e) => {
                    tracing::warn!(file = %file_display, error = %e, "skipping rule card");
                    failures.push(LoadFailure {
                        file: file_display,
                        message: e.to_string(),
                    });
                }
            }
        }

        if rules.is_empty() {
            return Err(GuardrailError::NoRulesLoaded);
        }

        Ok(Self {
            rules,
            by_id,
            failures,
        })
    }

    pub fn lookup(&self, id: &str) -> Result<&RuleCard> {
        self.by_id
            .get(id)
            .map(|&i| &self.rules[i])
            .ok_or_else(|| GuardrailError::RuleNotFound(id.to_string()))
    }

    /// Order-preserving query over the loaded cards.
    pub fn filter<P>(&self, predicate: P) -> Vec<&RuleCard>
    where
        P: Fn(&RuleCard) -> bool,
    {
        self.rules.iter().filter(|c| predicate(c)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleCard> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Files that failed to load, in discovery order.
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }
}

fn load_card(file: &Path) -> Result<RuleCard> {
    let display = file.display().to_string();
    let data = std::fs::read_to_string(file)?;
    let raw: RawRuleCard = serde_yaml::from_str(&data).map_err(|e| GuardrailError::Parse {
        file: display.clone(),
        message: e.to_string(),
    })?;
    raw.validate(&display)
}

/// Expand the given paths into a sorted list of YAML files. Directories are
/// walked recursively; explicit file paths are taken as-is.
fn collect_rule_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk_dir(path, &mut files)?;
        } else if path.is_file() {
            files.push(path.clone());
        }
    }
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        ) {
            files.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use tempfile::TempDir;

    fn write_card(dir: &Path, rel: &str, id: &str, severity: &str) {
        let body = format!(
            "id: {id}\ntitle: Test rule {id}\nseverity: {severity}\nscope: any\n\
             requirement: Some requirement text.\nrefs:\n  cwe:\n    - CWE-798\n"
        );
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn load_lookup_and_filter() {
        let dir = TempDir::new().unwrap();
        write_card(dir.path(), "secrets/api-001.yaml", "SECRETS-API-001", "critical");
        write_card(dir.path(), "sqli/web-001.yaml", "SQLI-WEB-001", "high");

        let reg = RuleRegistry::load(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(reg.len(), 2);
        assert!(reg.failures().is_empty());

        let card = reg.lookup("SECRETS-API-001").unwrap();
        assert_eq!(card.severity, Severity::Critical);

        let err = reg.lookup("NOPE").unwrap_err();
        assert!(matches!(err, GuardrailError::RuleNotFound(_)));

        let criticals = reg.filter(|c| c.severity == Severity::Critical);
        assert_eq!(criticals.len(), 1);
        assert_eq!(criticals[0].id, "SECRETS-API-001");
    }

    #[test]
    fn load_order_is_sorted_file_walk() {
        let dir = TempDir::new().unwrap();
        // Written out of order; sorted walk puts a/ before b/.
        write_card(dir.path(), "b/card.yaml", "SQLI-WEB-001", "high");
        write_card(dir.path(), "a/card.yaml", "SECRETS-API-001", "critical");

        let reg = RuleRegistry::load(&[dir.path().to_path_buf()]).unwrap();
        let ids: Vec<&str> = reg.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["SECRETS-API-001", "SQLI-WEB-001"]);

        let all = reg.filter(|_| true);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "SECRETS-API-001");
    }

    #[test]
    fn duplicate_id_fails_whole_load() {
        let dir = TempDir::new().unwrap();
        write_card(dir.path(), "a.yaml", "SECRETS-API-001", "critical");
        write_card(dir.path(), "b.yaml", "SECRETS-API-001", "low");

        let err = RuleRegistry::load(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, GuardrailError::Schema { .. }));
        assert!(err.to_string().contains("duplicate rule id"));
    }

    #[test]
    fn malformed_file_is_contained() {
        let dir = TempDir::new().unwrap();
        write_card(dir.path(), "good.yaml", "SECRETS-API-001", "critical");
        std::fs::write(dir.path().join("bad.yaml"), "id: [unclosed").unwrap();

        let reg = RuleRegistry::load(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.failures().len(), 1);
        assert!(reg.failures()[0].file.ends_with("bad.yaml"));
    }

    #[test]
    fn invalid_card_is_contained() {
        let dir = TempDir::new().unwrap();
        write_card(dir.path(), "good.yaml", "SECRETS-API-001", "critical");
        std::fs::write(
            dir.path().join("noseverity.yaml"),
            "id: SQLI-WEB-001\ntitle: t\nscope: any\nrequirement: r\nrefs:\n  cwe: [CWE-89]\n",
        )
        .unwrap();

        let reg = RuleRegistry::load(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.failures().len(), 1);
        assert!(reg.failures()[0].message.contains("severity"));
    }

    #[test]
    fn empty_dir_fails() {
        let dir = TempDir::new().unwrap();
        let err = RuleRegistry::load(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, GuardrailError::NoRulesLoaded));
    }

    #[test]
    fn loading_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write_card(dir.path(), "a.yaml", "SECRETS-API-001", "critical");
        write_card(dir.path(), "b.yaml", "SQLI-WEB-001", "high");

        let first = RuleRegistry::load(&[dir.path().to_path_buf()]).unwrap();
        let second = RuleRegistry::load(&[dir.path().to_path_buf()]).unwrap();

        let a: Vec<_> = first.iter().collect();
        let b: Vec<_> = second.iter().collect();
        assert_eq!(a, b);
    }
}
