//! FIR firmware validation CLI (fircheck)
//!
//! **Usage:**
//! ```bash
//! fircheck run <adapter-id> <stage>... [--simulator] [--seed N] [--taps N]
//! fircheck generate [--output FILE] [--duration SECS] [--seed N]
//! fircheck reference [--input FILE] [--output FILE] [--taps N]
//! fircheck compare --stages <stage>... | all
//! fircheck perf --count N | --stages <stage>...
//! ```
//!
//! Exit status for `run`: 0 when every stage succeeded, 1 when the run could
//! not start (configuration or pre-flight), 2 when any stage failed or was
//! cancelled.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fircheck_common::{ExecutionMode, TomlConfig, Waveform};
use fircheck_runner::{
    executor_for, ArtifactLayout, CancellationFlag, CliFormatter, FilterSpec, MetricsAggregator,
    PipelineConfig, PipelineOrchestrator, ReferenceFilter, ResultComparator, RunStatus,
    SignalGenerator, ValidationSummary,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Stage-by-stage FIR firmware validation
#[derive(Parser, Debug)]
#[command(name = "fircheck")]
#[command(about = "Validate staged FIR filter firmware against a golden reference")]
#[command(version)]
struct Cli {
    /// Configuration file (overrides FIRCHECK_CONFIG and ./fircheck.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run stages on the target (or simulator) and validate their output
    Run(RunArgs),

    /// Write a fresh input noise waveform
    Generate(GenerateArgs),

    /// Compute the reference output for an existing input waveform
    Reference(ReferenceArgs),

    /// Compare existing stage outputs against the reference
    Compare(CompareArgs),

    /// Print a timing table from existing metrics files
    Perf(PerfArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Debug adapter id of the target device
    #[arg(env = "FIRCHECK_ADAPTER_ID")]
    adapter_id: String,

    /// Stage names, run in the order given (bin/<stage>.xe)
    #[arg(required = true)]
    stages: Vec<String>,

    /// Run on the simulator instead of hardware
    #[arg(long)]
    simulator: bool,

    /// Seed for the input noise generator
    #[arg(long)]
    seed: Option<u64>,

    /// Input duration (seconds)
    #[arg(long)]
    duration: Option<f64>,

    /// Reference filter tap count
    #[arg(long)]
    taps: Option<usize>,

    /// Allowed per-sample deviation from the reference (LSB)
    #[arg(long)]
    tolerance: Option<u64>,

    /// Reuse an existing input waveform instead of generating one
    #[arg(long)]
    reuse_input: bool,

    /// Firmware directory
    #[arg(long, value_name = "DIR")]
    bin_dir: Option<PathBuf>,

    /// Artifact directory
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Output WAV file (default: configured input path)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Duration (seconds)
    #[arg(long)]
    duration: Option<f64>,

    #[arg(long)]
    sample_rate: Option<u32>,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ReferenceArgs {
    /// Input WAV file (default: configured input path)
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output WAV file (default: <out_dir>/reference.wav)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[arg(long)]
    taps: Option<usize>,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Stage names, or `all` for every stage output in the artifact directory
    #[arg(long, num_args = 1.., required = true)]
    stages: Vec<String>,

    #[arg(long)]
    tolerance: Option<u64>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct PerfArgs {
    /// Report stage0 through stage<N-1>
    #[arg(long)]
    count: Option<usize>,

    /// Report the named stages
    #[arg(long, num_args = 1..)]
    stages: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = TomlConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging.level);

    match cli.command {
        Command::Run(args) => run(config, args).await,
        Command::Generate(args) => generate(&config, args),
        Command::Reference(args) => reference(&config, args),
        Command::Compare(args) => compare(&config, args),
        Command::Perf(args) => perf(&config, args),
    }
}

/// RUST_LOG wins over the configured level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(mut config: TomlConfig, args: RunArgs) -> Result<ExitCode> {
    config.executor.adapter_id = Some(args.adapter_id.clone());
    if args.simulator {
        config.executor.mode = ExecutionMode::Simulator;
    }
    if let Some(dir) = args.bin_dir {
        config.pipeline.bin_dir = dir;
    }
    if let Some(dir) = args.out_dir {
        config.pipeline.out_dir = dir;
    }
    if let Some(taps) = args.taps {
        config.pipeline.tap_count = taps;
    }
    if let Some(duration) = args.duration {
        config.pipeline.duration_secs = duration;
    }
    if let Some(tolerance) = args.tolerance {
        config.pipeline.tolerance_lsb = tolerance;
    }
    if args.seed.is_some() {
        config.pipeline.seed = args.seed;
    }
    if args.reuse_input {
        config.pipeline.reuse_input = true;
    }

    let pipeline = PipelineConfig::from_toml(&config);
    let tap_count = pipeline.filter.tap_count();
    let tolerance = pipeline.tolerance_lsb;
    let summary_path = pipeline.layout.summary_path();
    let executor = executor_for(&config.executor).context("Failed to configure executor")?;

    info!(
        adapter = %args.adapter_id,
        mode = %pipeline.mode,
        stages = ?args.stages,
        "Starting validation run"
    );

    let cancel = CancellationFlag::new();
    let orchestrator = PipelineOrchestrator::new(pipeline, executor).with_cancellation(cancel.clone());

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, stopping after the current stage");
            cancel.cancel();
        }
    });

    let stages = args.stages;
    let outcome = tokio::task::spawn_blocking(move || orchestrator.run_pipeline(&stages))
        .await
        .context("Pipeline task panicked")?;
    ctrl_c.abort();

    let status = RunStatus::from_outcome(&outcome);
    let run = match outcome {
        Ok(run) => run,
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Validation run could not start");
            eprintln!("Error: Validation run could not start: {}", e);
            return Ok(ExitCode::from(status.code()));
        }
    };

    let summary = ValidationSummary::summarize(&run, tap_count, tolerance);
    summary
        .export_json(&summary_path)
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;

    for stage in &summary.stages {
        println!("{}", CliFormatter::format_stage_line(stage));
    }
    print!("{}", CliFormatter::format_summary(&summary));
    print!("{}", CliFormatter::format_performance(&summary.metrics, tap_count));

    Ok(ExitCode::from(status.code()))
}

fn generate(config: &TomlConfig, args: GenerateArgs) -> Result<ExitCode> {
    let pipeline = &config.pipeline;
    let output = args.output.unwrap_or_else(|| pipeline.input_wav.clone());

    let waveform = SignalGenerator::generate_to(
        &output,
        args.duration.unwrap_or(pipeline.duration_secs),
        args.sample_rate.unwrap_or(pipeline.sample_rate),
        args.seed.or(pipeline.seed),
    )
    .with_context(|| format!("Failed to generate {}", output.display()))?;

    println!(
        "Wrote {} ({} samples at {} Hz)",
        output.display(),
        waveform.len(),
        waveform.sample_rate()
    );
    Ok(ExitCode::SUCCESS)
}

fn reference(config: &TomlConfig, args: ReferenceArgs) -> Result<ExitCode> {
    let pipeline = PipelineConfig::from_toml(config);
    let input_path = args.input.unwrap_or(pipeline.input_path);
    let output_path = args
        .output
        .unwrap_or_else(|| pipeline.layout.reference_path());
    let filter = args
        .taps
        .map(FilterSpec::moving_average)
        .unwrap_or(pipeline.filter);

    let input = Waveform::read_wav(&input_path)
        .with_context(|| format!("Failed to read input {}", input_path.display()))?;
    let output = ReferenceFilter::compute(&input, &filter).context("Reference filter failed")?;
    output
        .write_wav(&output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!(
        "Wrote {} ({} taps, {} samples)",
        output_path.display(),
        filter.tap_count(),
        output.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn compare(config: &TomlConfig, args: CompareArgs) -> Result<ExitCode> {
    let pipeline = PipelineConfig::from_toml(config);
    let layout = &pipeline.layout;
    let tolerance = args.tolerance.unwrap_or(pipeline.tolerance_lsb);

    let reference_path = layout.reference_path();
    let reference = Waveform::read_wav(&reference_path)
        .with_context(|| format!("Failed to read reference {}", reference_path.display()))?;

    let stages = if args.stages.iter().any(|s| s == "all") {
        discover_stage_outputs(&layout.out_dir)?
    } else {
        args.stages
    };
    if stages.is_empty() {
        bail!("No stage outputs found in {}", layout.out_dir.display());
    }

    let tally = compare_outputs(layout, &reference, &stages, tolerance);
    if tally.all_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(RunStatus::StageFailures.code()))
    }
}

/// Result of comparing a set of existing stage outputs
#[derive(Debug, Default)]
struct CompareTally {
    within_tolerance: Vec<String>,
    out_of_tolerance: Vec<String>,
    unreadable: Vec<String>,
    missing: Vec<String>,
}

impl CompareTally {
    fn all_ok(&self) -> bool {
        self.out_of_tolerance.is_empty() && self.unreadable.is_empty()
    }
}

/// Compare each stage output with the reference, skipping missing outputs
///
/// An unreadable or incomparable output is reported and counted, the
/// remaining stages are still compared.
fn compare_outputs(
    layout: &ArtifactLayout,
    reference: &Waveform,
    stages: &[String],
    tolerance: u64,
) -> CompareTally {
    let mut tally = CompareTally::default();

    for stage in stages {
        let path = layout.output_path(stage);
        if !path.exists() {
            warn!(stage = %stage, path = %path.display(), "No output for stage, skipping");
            tally.missing.push(stage.clone());
            continue;
        }

        let report = Waveform::read_wav(&path)
            .and_then(|actual| ResultComparator::compare(&actual, reference));
        match report {
            Ok(report) => {
                println!("{}", CliFormatter::format_comparison(stage, &report, tolerance));
                if report.within_tolerance(tolerance) {
                    tally.within_tolerance.push(stage.clone());
                } else {
                    tally.out_of_tolerance.push(stage.clone());
                }
            }
            Err(e) => {
                warn!(stage = %stage, path = %path.display(), error = %e, "Cannot compare stage output");
                println!("{}: UNREADABLE ({})", stage, e);
                tally.unreadable.push(stage.clone());
            }
        }
    }
    tally
}

fn perf(config: &TomlConfig, args: PerfArgs) -> Result<ExitCode> {
    let pipeline = PipelineConfig::from_toml(config);

    let stages: Vec<String> = match (args.count, args.stages) {
        (_, Some(stages)) => stages,
        (Some(count), None) => (0..count).map(|i| format!("stage{}", i)).collect(),
        (None, None) => bail!("Either --count or --stages is required"),
    };

    let metrics = MetricsAggregator::collect_from_files(&pipeline.layout, &stages);
    print!(
        "{}",
        CliFormatter::format_performance(&metrics, pipeline.filter.tap_count())
    );
    Ok(ExitCode::SUCCESS)
}

/// Stage names of every `output-<stage>.wav` in `out_dir`, sorted
fn discover_stage_outputs(out_dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(out_dir)
        .with_context(|| format!("Failed to read {}", out_dir.display()))?;

    let mut stages = Vec::new();
    for entry in entries {
        let name = entry?.file_name().to_string_lossy().to_string();
        if let Some(stage) = name
            .strip_prefix("output-")
            .and_then(|rest| rest.strip_suffix(".wav"))
        {
            stages.push(stage.to_string());
        }
    }
    stages.sort();
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["fircheck", "run", "L3Xq7", "stage0", "stage1", "--simulator"]).unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.adapter_id, "L3Xq7");
                assert_eq!(args.stages, vec!["stage0", "stage1"]);
                assert!(args.simulator);
            }
            other => panic!("Expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_perf_requires_selection() {
        assert!(Cli::try_parse_from(["fircheck", "perf"]).is_err());
        assert!(Cli::try_parse_from(["fircheck", "perf", "--count", "3"]).is_ok());
    }

    #[test]
    fn test_compare_continues_past_corrupt_output() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("bin"), dir.path().join("out"));
        std::fs::create_dir_all(&layout.out_dir).unwrap();

        let reference = Waveform::new(16_000, vec![5, -5, 5, -5]);
        std::fs::write(layout.output_path("stage0"), b"RIFF not really a wav").unwrap();
        reference.write_wav(layout.output_path("stage1")).unwrap();
        Waveform::new(48_000, vec![5, -5, 5, -5])
            .write_wav(layout.output_path("stage2"))
            .unwrap();

        let stages: Vec<String> = ["stage0", "stage1", "stage2", "stage3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tally = compare_outputs(&layout, &reference, &stages, 0);

        assert_eq!(tally.within_tolerance, vec!["stage1"]);
        assert_eq!(tally.unreadable, vec!["stage0", "stage2"]);
        assert_eq!(tally.missing, vec!["stage3"]);
        assert!(!tally.all_ok());
    }

    #[test]
    fn test_compare_all_matching_is_ok() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("bin"), dir.path().join("out"));
        let reference = Waveform::new(16_000, vec![1, 2, 3]);
        reference.write_wav(layout.output_path("stage0")).unwrap();

        let tally = compare_outputs(&layout, &reference, &["stage0".to_string()], 0);
        assert!(tally.all_ok());
        assert!(tally.out_of_tolerance.is_empty());
    }

    #[test]
    fn test_discover_stage_outputs() {
        let dir = TempDir::new().unwrap();
        for name in ["output-stage1.wav", "output-stage0.wav", "reference.wav", "stage0.json"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let stages = discover_stage_outputs(dir.path()).unwrap();
        assert_eq!(stages, vec!["stage0", "stage1"]);
    }
}
