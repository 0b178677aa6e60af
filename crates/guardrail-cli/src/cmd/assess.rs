use crate::cmd::rules::load_registry;
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use guardrail_core::assess::{Assessor, ValidationRequest};
use guardrail_core::config::ScoringConfig;
use guardrail_core::scorer::{PracticeEvidence, TestOutcome};
use guardrail_core::taxonomy::Taxonomy;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum AssessSubcommand {
    /// Score one practice from scanner reports and evidence
    Run {
        /// Practice id (e.g. PW.5)
        practice_id: String,

        /// Target language
        #[arg(long)]
        language: String,

        /// Scanner report to ingest, as TOOL=PATH (repeatable)
        #[arg(long = "report", value_name = "TOOL=PATH")]
        reports: Vec<String>,

        /// Code path that was scanned (repeatable)
        #[arg(long = "code-path")]
        code_paths: Vec<String>,

        /// Secure patterns observed in the code
        #[arg(long, default_value_t = 0)]
        patterns_observed: u32,

        /// Secure patterns expected for this practice
        #[arg(long, default_value_t = 0)]
        patterns_expected: u32,

        /// Security tests passing (omit when no tests were run)
        #[arg(long)]
        tests_passing: Option<u32>,

        /// Security tests total (omit when no tests were run)
        #[arg(long)]
        tests_total: Option<u32>,

        /// Documented procedures in place
        #[arg(long, default_value_t = 0)]
        procedures_documented: u32,

        /// Procedures the practice requires
        #[arg(long, default_value_t = 0)]
        procedures_required: u32,

        /// Rules directory (default: .guardrail/rules)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

pub fn run(root: &Path, subcmd: AssessSubcommand, json: bool) -> anyhow::Result<()> {
    let AssessSubcommand::Run {
        practice_id,
        language,
        reports,
        code_paths,
        patterns_observed,
        patterns_expected,
        tests_passing,
        tests_total,
        procedures_documented,
        procedures_required,
        dir,
    } = subcmd;

    let registry = load_registry(root, dir)?;
    let taxonomy = Taxonomy::builtin();
    let config = ScoringConfig::load(root).context("failed to load scoring config")?;
    for warning in config.validate() {
        tracing::warn!(message = %warning.message, "scoring config");
    }

    let raw_reports = read_reports(&reports)?;

    let evidence = PracticeEvidence {
        secure_patterns_observed: patterns_observed,
        secure_patterns_expected: patterns_expected,
        security_tests: match (tests_passing, tests_total) {
            (Some(passing), Some(total)) => Some(TestOutcome { passing, total }),
            _ => None,
        },
        documented_procedures: procedures_documented,
        required_procedures: procedures_required,
    };

    let request = ValidationRequest {
        practice_id: practice_id.clone(),
        practice_name: taxonomy
            .resolve(&practice_id)
            .map(|p| p.name.clone())
            .unwrap_or_default(),
        language,
        code_paths,
        context: None,
    };

    let assessor = Assessor::new(&registry, &taxonomy, &config);
    let response = assessor.assess(&request, &raw_reports, &evidence)?;

    if json {
        print_json(&response)?;
        return Ok(());
    }

    match response.compliance_score {
        Some(score) => println!(
            "{}: {}/100 ({})",
            response.practice_id, score, response.status
        ),
        None => println!("{}: not scored ({})", response.practice_id, response.status),
    }
    for f in &response.technical_findings {
        println!(
            "  {} x{} [{}] via {}",
            f.finding_type, f.count, f.severity, f.source_tool
        );
    }
    for r in &response.recommendations {
        println!("  -> {r}");
    }
    Ok(())
}

/// Parse TOOL=PATH arguments and read each report file.
fn read_reports(specs: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for spec in specs {
        let (tool, path) = spec
            .split_once('=')
            .with_context(|| format!("invalid report spec '{spec}': expected TOOL=PATH"))?;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report {path}"))?;
        out.push((tool.to_string(), raw));
    }
    Ok(out)
}
