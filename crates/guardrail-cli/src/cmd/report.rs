use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use guardrail_core::report;
use guardrail_core::scorer::PracticeScore;
use guardrail_core::taxonomy::Taxonomy;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ReportSubcommand {
    /// Render a compliance report from a JSON array of practice scores
    Render {
        /// Path to a JSON file with the collected practice scores
        scores: PathBuf,
    },
}

pub fn run(subcmd: ReportSubcommand, json: bool) -> anyhow::Result<()> {
    let ReportSubcommand::Render { scores } = subcmd;

    let data = std::fs::read_to_string(&scores)
        .with_context(|| format!("failed to read {}", scores.display()))?;
    let scores: Vec<PracticeScore> =
        serde_json::from_str(&data).context("scores file must be a JSON array of practice scores")?;

    let taxonomy = Taxonomy::builtin();
    let rendered = report::render(&scores, &taxonomy)?;

    if json {
        print_json(&rendered)?;
        return Ok(());
    }

    println!("Compliance report ({})", chrono::Utc::now().to_rfc3339());
    match rendered.overall_score {
        Some(score) => println!("Overall: {score}/100"),
        None => println!("Overall: not scored"),
    }
    println!();

    let phase_rows: Vec<Vec<String>> = rendered
        .phases
        .iter()
        .map(|p| {
            vec![
                p.phase.to_string(),
                p.score.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                format!("{}/{}", p.practices_scored, p.practices_total),
            ]
        })
        .collect();
    print_table(&["PHASE", "SCORE", "SCORED"], phase_rows);

    if !rendered.gaps.is_empty() {
        println!();
        let gap_rows: Vec<Vec<String>> = rendered
            .gaps
            .iter()
            .map(|g| {
                vec![
                    g.practice_id.clone(),
                    g.score.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                    g.status.to_string(),
                    g.top_severity
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".into()),
                ]
            })
            .collect();
        print_table(&["GAP", "SCORE", "STATUS", "TOP SEVERITY"], gap_rows);
    }

    if !rendered.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for r in &rendered.recommendations {
            println!("  -> {r}");
        }
    }
    Ok(())
}
