use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use guardrail_core::paths;
use guardrail_core::registry::RuleRegistry;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum RulesSubcommand {
    /// Load all rule cards and report validation failures
    Validate {
        /// Rules directory (default: .guardrail/rules)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List loaded rule cards
    List {
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Show one rule card by id
    Show {
        /// Rule id (e.g. SECRETS-API-001)
        id: String,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

pub fn run(root: &Path, subcmd: RulesSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RulesSubcommand::Validate { dir } => validate(root, dir, json),
        RulesSubcommand::List { dir } => list(root, dir, json),
        RulesSubcommand::Show { id, dir } => show(root, dir, &id, json),
    }
}

pub fn load_registry(root: &Path, dir: Option<PathBuf>) -> anyhow::Result<RuleRegistry> {
    let dir = dir.unwrap_or_else(|| paths::rules_dir(root));
    RuleRegistry::load(&[dir.clone()])
        .with_context(|| format!("failed to load rule cards from {}", dir.display()))
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, dir: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let registry = load_registry(root, dir)?;

    if json {
        let value = serde_json::json!({
            "loaded": registry.len(),
            "failures": registry.failures(),
        });
        print_json(&value)?;
    } else {
        println!("Loaded {} rule card(s).", registry.len());
        for failure in registry.failures() {
            println!("  FAILED {}: {}", failure.file, failure.message);
        }
    }

    if !registry.failures().is_empty() {
        anyhow::bail!(
            "{} rule card(s) failed validation",
            registry.failures().len()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, dir: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let registry = load_registry(root, dir)?;

    if json {
        let cards: Vec<_> = registry.iter().collect();
        print_json(&cards)?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = registry
        .iter()
        .map(|c| {
            vec![
                c.id.clone(),
                c.severity.to_string(),
                c.scope.clone(),
                c.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "SEVERITY", "SCOPE", "TITLE"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, dir: Option<PathBuf>, id: &str, json: bool) -> anyhow::Result<()> {
    let registry = load_registry(root, dir)?;
    let card = registry.lookup(id)?;

    if json {
        print_json(card)?;
    } else {
        print!("{}", serde_yaml::to_string(card)?);
    }
    Ok(())
}
