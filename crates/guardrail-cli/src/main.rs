mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    assess::AssessSubcommand, bundle::BundleSubcommand, report::ReportSubcommand,
    rules::RulesSubcommand, taxonomy::TaxonomySubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "guardrail",
    about = "Compile security rule bundles and score SSDF compliance",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .guardrail/ or .git/)
    #[arg(long, global = true, env = "GUARDRAIL_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate, and inspect rule cards
    Rules {
        #[command(subcommand)]
        subcommand: RulesSubcommand,
    },

    /// Inspect the SSDF practice taxonomy
    Taxonomy {
        #[command(subcommand)]
        subcommand: TaxonomySubcommand,
    },

    /// Compile and inspect agent bundles
    Bundle {
        #[command(subcommand)]
        subcommand: BundleSubcommand,
    },

    /// Score practices from scanner reports and evidence
    Assess {
        #[command(subcommand)]
        subcommand: AssessSubcommand,
    },

    /// Render compliance reports from collected scores
    Report {
        #[command(subcommand)]
        subcommand: ReportSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Rules { subcommand } => cmd::rules::run(&root, subcommand, cli.json),
        Commands::Taxonomy { subcommand } => cmd::taxonomy::run(subcommand, cli.json),
        Commands::Bundle { subcommand } => cmd::bundle::run(&root, subcommand, cli.json),
        Commands::Assess { subcommand } => cmd::assess::run(&root, subcommand, cli.json),
        Commands::Report { subcommand } => cmd::report::run(subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
