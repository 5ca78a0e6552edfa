//! Expiry Returns CLI
//!
//! Command-line driver: preprocess a raw option-chain table into the
//! enriched table, build reports from it, or do both in one run.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use expiry_returns::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "expiry-returns",
    version,
    about = "Hold-to-expiration option returns by bucket, quarter and earnings proximity"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize, expand and enrich a raw quote table
    Preprocess(PreprocessArgs),
    /// Build one report from an enriched table
    Report(ReportArgs),
    /// Preprocess and write every report into a directory
    RunAll(RunAllArgs),
}

#[derive(Args, Debug, Clone)]
struct ConfigArg {
    /// JSON configuration overriding the defaults
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct PreprocessArgs {
    /// Raw option-chain CSV
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Enriched CSV to write
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    #[command(flatten)]
    config: ConfigArg,
}

#[derive(Args, Debug, Clone)]
struct ReportArgs {
    /// Enriched CSV produced by `preprocess`
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// returns-by-bucket, risk-adjusted, by-quarter, delta-scatter or by-event
    #[arg(short = 'k', long = "kind")]
    kind: ReportKind,

    /// Report CSV to write
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    #[command(flatten)]
    config: ConfigArg,
}

#[derive(Args, Debug, Clone)]
struct RunAllArgs {
    /// Raw option-chain CSV
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Directory receiving enriched.csv and one CSV per report
    #[arg(long = "out-dir")]
    out_dir: PathBuf,

    #[command(flatten)]
    config: ConfigArg,
}

fn load_config(arg: &ConfigArg) -> AnalysisResult<PipelineConfig> {
    match &arg.config {
        Some(path) => PipelineConfig::from_json_file(path),
        None => Ok(PipelineConfig::default()),
    }
}

fn preprocess(input: &Path, config: &PipelineConfig) -> AnalysisResult<Vec<EnrichedObservation>> {
    let raw = RawTable::from_path(input)?;
    Preprocessor::with_config(config.clone()).run_raw(&raw)
}

fn run_preprocess(args: PreprocessArgs) -> AnalysisResult<()> {
    let config = load_config(&args.config)?;
    let enriched = preprocess(&args.input, &config)?;
    write_enriched_csv(&args.output, &enriched)
}

fn run_report(args: ReportArgs) -> AnalysisResult<()> {
    let config = load_config(&args.config)?;
    let enriched = read_enriched_csv(&args.input, &config.bins)?;
    let report = ReportBuilder::with_config(config).build(args.kind, &enriched);
    write_report(&args.output, &report)
}

fn run_all(args: RunAllArgs) -> AnalysisResult<()> {
    let config = load_config(&args.config)?;
    run_to_dir(&args.input, &args.out_dir, &config)?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Preprocess(args) => run_preprocess(args),
        Command::Report(args) => run_report(args),
        Command::RunAll(args) => run_all(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
