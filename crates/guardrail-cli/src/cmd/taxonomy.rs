use crate::output::{print_json, print_table};
use clap::Subcommand;
use guardrail_core::taxonomy::Taxonomy;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum TaxonomySubcommand {
    /// List all practices
    List,

    /// Show one practice and its sub-practices
    Show {
        /// Practice id (e.g. PW.4)
        practice_id: String,
    },
}

pub fn run(subcmd: TaxonomySubcommand, json: bool) -> anyhow::Result<()> {
    let taxonomy = Taxonomy::builtin();
    match subcmd {
        TaxonomySubcommand::List => list(&taxonomy, json),
        TaxonomySubcommand::Show { practice_id } => show(&taxonomy, &practice_id, json),
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(taxonomy: &Taxonomy, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&taxonomy.practices())?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = taxonomy
        .practices()
        .iter()
        .map(|p| {
            vec![
                p.practice_id.clone(),
                p.phase.to_string(),
                p.sub_practices.len().to_string(),
                p.name.clone(),
            ]
        })
        .collect();
    print_table(&["PRACTICE", "PHASE", "SUBS", "NAME"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(taxonomy: &Taxonomy, practice_id: &str, json: bool) -> anyhow::Result<()> {
    let practice = taxonomy.resolve(practice_id)?;

    if json {
        print_json(practice)?;
        return Ok(());
    }

    println!("{}  {}", practice.practice_id, practice.name);
    println!("phase: {}", practice.phase);
    println!("sub-practices: {}", practice.sub_practices.join(", "));
    println!(
        "expected rule categories: {}",
        practice
            .expected_rule_categories
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}
