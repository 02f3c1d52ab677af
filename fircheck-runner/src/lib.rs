//! # FIR Firmware Validation Runner (fircheck-runner)
//!
//! Validates staged FIR filter firmware against a bit-exact golden reference.
//!
//! **Purpose:** Generate a shared noise input, compute the reference output,
//! run each firmware stage on the target device or simulator, compare the
//! captured output sample by sample and aggregate the timing each stage
//! reports.
//!
//! **Architecture:** Sequential stage pipeline behind a pluggable
//! `HardwareExecutor`; all artifacts are mono 32-bit WAV or small JSON files.

pub mod compare;
pub mod config;
pub mod executor;
pub mod metrics;
pub mod orchestrator;
pub mod reference;
pub mod report;
pub mod runner;
pub mod signal;
pub mod stage;
pub mod state;

pub use compare::{ComparisonReport, ComparisonWarning, ResultComparator};
pub use config::{InputSource, PipelineConfig};
pub use executor::{executor_for, ExecutorError, HardwareExecutor, SimulatorExecutor, TargetExecutor};
pub use metrics::{MetricsAggregator, StageMetrics};
pub use orchestrator::{
    CancellationFlag, PipelineOrchestrator, PipelineRun, RunManifest, RunStatus, StageOutcome,
};
pub use reference::{FilterSpec, ReferenceFilter};
pub use report::{CliFormatter, ValidationSummary};
pub use runner::StageRunner;
pub use signal::SignalGenerator;
pub use stage::{ArtifactLayout, MetricsRecord, Stage, StageResult};
pub use state::StageState;
