use crate::cmd::rules::load_registry;
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use guardrail_core::bundle::{self, AgentBundle};
use guardrail_core::paths;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum BundleSubcommand {
    /// Compile the bundle for a topic and language
    Compile {
        /// Topic tag (matched against the TOPIC segment of rule ids)
        topic: String,
        /// Target language (matched against rule scope)
        language: String,
        /// Rules directory (default: .guardrail/rules)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Write the artifact under .guardrail/bundles/
        #[arg(long)]
        write: bool,
    },

    /// Show a previously compiled bundle artifact
    Show {
        topic: String,
        language: String,
    },
}

pub fn run(root: &Path, subcmd: BundleSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        BundleSubcommand::Compile {
            topic,
            language,
            dir,
            write,
        } => compile(root, &topic, &language, dir, write, json),
        BundleSubcommand::Show { topic, language } => show(root, &topic, &language, json),
    }
}

// ---------------------------------------------------------------------------
// compile
// ---------------------------------------------------------------------------

fn compile(
    root: &Path,
    topic: &str,
    language: &str,
    dir: Option<PathBuf>,
    write: bool,
    json: bool,
) -> anyhow::Result<()> {
    let registry = load_registry(root, dir)?;
    let compiled = bundle::compile(topic, language, &registry)?;

    if write {
        let path = bundle::write(&compiled, root).context("failed to write bundle artifact")?;
        if !json {
            println!("Wrote {}", path.display());
        }
    }

    if json {
        print_json(&compiled)?;
    } else {
        println!(
            "Compiled bundle {} with {} rule(s):",
            compiled.bundle_id,
            compiled.rules.len()
        );
        for id in &compiled.rules {
            println!("  {id}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, topic: &str, language: &str, json: bool) -> anyhow::Result<()> {
    let path = paths::bundle_path(root, topic, language);
    let loaded = AgentBundle::load(&path)
        .with_context(|| format!("no compiled bundle at {}", path.display()))?;

    if json {
        print_json(&loaded)?;
    } else {
        println!("{} ({} rules)", loaded.bundle_id, loaded.rules.len());
        for id in &loaded.rules {
            println!("  {id}");
        }
    }
    Ok(())
}
