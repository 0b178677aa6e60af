use crate::error::{GuardrailError, Result};
use crate::paths;
use crate::registry::RuleRegistry;
use crate::rule::RuleCard;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Upper bound on rules per compiled bundle. Rule sets should offer at
/// least six applicable cards per (topic, language), but a thinner set
/// compiles to a shorter bundle rather than failing.
pub const BUNDLE_RULE_CAP: usize = 12;

// ---------------------------------------------------------------------------
// AgentBundle
// ---------------------------------------------------------------------------

/// A compiled, deterministic subset of rule ids for one topic+language
/// pair. `bundle_id` embeds a content hash of the source rule set, so an
/// unchanged registry recompiles to a byte-identical artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBundle {
    pub bundle_id: String,
    pub topic: String,
    pub language: String,
    pub rules: Vec<String>,
}

impl AgentBundle {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let bundle: AgentBundle = serde_json::from_str(&data)?;
        Ok(bundle)
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile the bundle for (topic, language) from the loaded registry.
///
/// Selection: applicable cards (topic segment and scope both match),
/// highest severity first, ties by id ascending, capped at
/// `BUNDLE_RULE_CAP`.
pub fn compile(topic: &str, language: &str, registry: &RuleRegistry) -> Result<AgentBundle> {
    let mut applicable: Vec<&RuleCard> = registry.filter(|c| {
        c.topic().eq_ignore_ascii_case(topic) && c.applies_to_language(language)
    });

    if applicable.is_empty() {
        return Err(GuardrailError::InsufficientRules {
            topic: topic.to_string(),
            language: language.to_string(),
        });
    }

    applicable.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then(a.id.cmp(&b.id))
    });
    applicable.truncate(BUNDLE_RULE_CAP);

    let topic = topic.to_lowercase();
    let language = language.to_lowercase();
    let hash = rule_set_hash(registry)?;
    let bundle_id = format!("{topic}-{language}-{}", &hash[..8]);

    Ok(AgentBundle {
        bundle_id,
        topic,
        language,
        rules: applicable.iter().map(|c| c.id.clone()).collect(),
    })
}

/// Write the bundle artifact under `.guardrail/bundles/`, atomically.
/// Returns the artifact path.
pub fn write(bundle: &AgentBundle, root: &Path) -> Result<PathBuf> {
    let path = paths::bundle_path(root, &bundle.topic, &bundle.language);
    let mut data = serde_json::to_vec_pretty(bundle)?;
    data.push(b'\n');
    crate::io::atomic_write(&path, &data)?;
    Ok(path)
}

/// SHA-256 over the canonical serialization of every loaded card, in load
/// order. This is the cache key component: any rule edit changes it.
fn rule_set_hash(registry: &RuleRegistry) -> Result<String> {
    let mut hasher = Sha256::new();
    for card in registry.iter() {
        hasher.update(serde_json::to_vec(card)?);
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
