mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use seal_reconcile::{check_deploy_gate, RecommendationTier, Reconciler};
use std::process::ExitCode;
use tracing::info;

use commands::report;

/// Exit code for `gate` when the deploy is blocked. 1 stays reserved for
/// tool errors.
const EXIT_BLOCKED: u8 = 2;

#[derive(Parser)]
#[command(name = "infraseal")]
#[command(about = "InfraSeal drift reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare declared and live state and print the drift report
    Analyze {
        #[command(flatten)]
        inputs: StateInputs,

        /// Print the report as pretty JSON instead of key=value lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Analyze, then exit 2 if the recommendation reaches the blocking tier
    Gate {
        #[command(flatten)]
        inputs: StateInputs,

        /// Blocking tier (stable | minor_drift | severe_drift). Overrides gate.block_at.
        #[arg(long = "block-at")]
        block_at: Option<RecommendationTier>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> team -> environment ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(clap::Args)]
struct StateInputs {
    /// Declared (IaC) state file: .json, .yaml or .yml
    #[arg(long)]
    declared: String,

    /// Live (observed) state file: .json, .yaml or .yml
    #[arg(long)]
    live: String,

    /// Layered config paths in merge order
    #[arg(long = "config")]
    config_paths: Vec<String>,
}

fn main() -> Result<ExitCode> {
    // Load .env.local if present (dev convenience). Silent if missing.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Analyze { inputs, json } => {
            let (cfg, reconciler, live) = prepare(&inputs)?;
            let report = reconciler.analyze_drift(&live).context("drift analysis failed")?;
            info!(
                recommendation = report.recommendation.as_str(),
                block_at = cfg.block_at.as_str(),
                "analyze complete"
            );

            if json {
                println!("{}", report::json(&report)?);
            } else {
                for line in report::text_lines(&report) {
                    println!("{line}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Gate { inputs, block_at } => {
            let (cfg, reconciler, live) = prepare(&inputs)?;
            let block_at = block_at.unwrap_or(cfg.block_at);
            let report = reconciler.analyze_drift(&live).context("drift analysis failed")?;
            let gate = check_deploy_gate(&report, block_at);

            for line in report::summary_lines(&report) {
                println!("{line}");
            }
            println!("block_at={block_at}");
            println!("{}", report::gate_line(&gate));

            if gate.is_blocked() {
                Ok(ExitCode::from(EXIT_BLOCKED))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = seal_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn prepare(
    inputs: &StateInputs,
) -> Result<(seal_config::SealConfig, Reconciler, seal_reconcile::StateNode)> {
    let cfg = commands::load_config(&inputs.config_paths)?;
    let declared = commands::load_state(&inputs.declared, &cfg.adapter)?;
    let live = commands::load_state(&inputs.live, &cfg.adapter)?;
    let reconciler = Reconciler::with_config(declared, cfg.reconciler.clone())
        .context("declared state rejected")?;
    Ok((cfg, reconciler, live))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
