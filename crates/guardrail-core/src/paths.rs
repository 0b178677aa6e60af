use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GUARDRAIL_DIR: &str = ".guardrail";
pub const RULES_DIR: &str = ".guardrail/rules";
pub const BUNDLES_DIR: &str = ".guardrail/bundles";

pub const CONFIG_FILE: &str = ".guardrail/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn guardrail_dir(root: &Path) -> PathBuf {
    root.join(GUARDRAIL_DIR)
}

pub fn rules_dir(root: &Path) -> PathBuf {
    root.join(RULES_DIR)
}

pub fn bundles_dir(root: &Path) -> PathBuf {
    root.join(BUNDLES_DIR)
}

pub fn bundle_path(root: &Path, topic: &str, language: &str) -> PathBuf {
    bundles_dir(root).join(format!(
        "{}-{}.json",
        topic.to_lowercase(),
        language.to_lowercase()
    ))
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Rule id validation
// ---------------------------------------------------------------------------

static RULE_ID_RE: OnceLock<Regex> = OnceLock::new();

fn rule_id_re() -> &'static Regex {
    // DOMAIN-TOPIC-NNN, e.g. SECRETS-API-001
    RULE_ID_RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9]*-[A-Z][A-Z0-9]*-\d{3}$").unwrap())
}

pub fn is_valid_rule_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && rule_id_re().is_match(id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
