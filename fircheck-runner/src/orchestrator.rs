//! Pipeline orchestration
//!
//! Drives one validation run:
//! 1. Pre-flight: every requested firmware image must exist (all-or-nothing)
//! 2. Prepare the shared input waveform and the golden reference once
//! 3. Run stages one at a time, in caller order
//!
//! The target device or simulator is a single shared resource, so stages are
//! never run concurrently. A failing stage is recorded and the next stage
//! still runs. Cancellation is honoured between stages only.

use crate::config::{InputSource, PipelineConfig};
use crate::executor::HardwareExecutor;
use crate::reference::ReferenceFilter;
use crate::runner::StageRunner;
use crate::signal::SignalGenerator;
use crate::stage::{Stage, StageResult};
use crate::state::{StageState, StageTracker};
use fircheck_common::{Error, MissingFirmware, Result, Waveform};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Shared flag used to stop a run before its next stage
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stages of a run plus the input every stage consumes
#[derive(Debug, Clone)]
pub struct RunManifest {
    pub stages: Vec<Stage>,
    pub input: Waveform,
    pub input_path: PathBuf,
}

/// Final state of one stage
#[derive(Debug)]
pub struct StageOutcome {
    pub stage: Stage,
    pub state: StageState,
    pub result: Result<StageResult>,
    pub elapsed: Duration,
}

impl StageOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Process exit status of a validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every stage succeeded
    Passed = 0,
    /// Bad parameters, missing firmware or input/reference preparation failed
    NotStarted = 1,
    /// At least one stage failed or was cancelled
    StageFailures = 2,
}

impl RunStatus {
    pub fn from_outcome(outcome: &Result<PipelineRun>) -> Self {
        match outcome {
            Err(_) => RunStatus::NotStarted,
            Ok(run) if run.all_succeeded() => RunStatus::Passed,
            Ok(_) => RunStatus::StageFailures,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Everything produced by `run_pipeline`
#[derive(Debug)]
pub struct PipelineRun {
    pub manifest: RunManifest,
    pub reference: Waveform,
    pub outcomes: Vec<StageOutcome>,
    pub elapsed: Duration,
}

impl PipelineRun {
    /// `(stage name, result)` pairs in run order
    pub fn results(&self) -> impl Iterator<Item = (&str, &Result<StageResult>)> {
        self.outcomes
            .iter()
            .map(|o| (o.stage.name.as_str(), &o.result))
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(StageOutcome::succeeded)
    }
}

pub struct PipelineOrchestrator {
    config: PipelineConfig,
    executor: Box<dyn HardwareExecutor>,
    cancel: CancellationFlag,
}

impl PipelineOrchestrator {
    /// Stages run in the executor's mode; a differing `config.mode` is overridden
    pub fn new(config: PipelineConfig, executor: Box<dyn HardwareExecutor>) -> Self {
        if config.mode != executor.mode() {
            warn!(
                configured = %config.mode,
                executor = %executor.mode(),
                "Configured mode differs from executor, using executor mode"
            );
        }
        Self {
            config,
            executor,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Resolve stage names and check every firmware image before running any
    ///
    /// Fails with `MissingArtifact` listing every missing stage.
    pub fn preflight<S: AsRef<str>>(&self, stage_names: &[S]) -> Result<Vec<Stage>> {
        if stage_names.is_empty() {
            return Err(Error::InvalidParameter("no stages requested".to_string()));
        }

        let mut seen = HashSet::new();
        for name in stage_names {
            let name = name.as_ref();
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(Error::InvalidParameter(format!(
                    "invalid stage name: {:?}",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(Error::InvalidParameter(format!(
                    "stage {} requested more than once",
                    name
                )));
            }
        }

        let stages: Vec<Stage> = stage_names
            .iter()
            .map(|name| self.config.layout.resolve(name.as_ref()))
            .collect();

        let missing: Vec<MissingFirmware> = stages
            .iter()
            .filter(|stage| !stage.firmware_path.exists())
            .map(|stage| MissingFirmware {
                stage: stage.name.clone(),
                path: stage.firmware_path.clone(),
            })
            .collect();

        if !missing.is_empty() {
            error!(missing = missing.len(), "Pre-flight failed, no stage will run");
            return Err(Error::MissingArtifact { missing });
        }
        Ok(stages)
    }

    /// Load or generate the shared input waveform and persist it for the firmware
    pub fn prepare_input(&self) -> Result<Waveform> {
        let path = &self.config.input_path;

        if self.config.input_source == InputSource::ReuseExisting && path.exists() {
            let input = Waveform::read_wav(path)?;
            info!(path = %path.display(), samples = input.len(), "Reusing input waveform");
            return Ok(input);
        }

        SignalGenerator::generate_to(
            path,
            self.config.duration_secs,
            self.config.sample_rate,
            self.config.seed,
        )
    }

    /// Run the requested stages in order
    ///
    /// Returns `Err` only for failures that prevent the run from starting
    /// (bad parameters, missing firmware, input/reference preparation).
    /// Per-stage failures are recorded in the returned outcomes.
    pub fn run_pipeline<S: AsRef<str>>(&self, stage_names: &[S]) -> Result<PipelineRun> {
        let run_started = Instant::now();
        let stages = self.preflight(stage_names)?;

        std::fs::create_dir_all(&self.config.layout.out_dir)?;

        let input = self.prepare_input()?;
        let reference = ReferenceFilter::compute(&input, &self.config.filter)?;
        reference.write_wav(self.config.layout.reference_path())?;

        let manifest = RunManifest {
            stages,
            input,
            input_path: self.config.input_path.clone(),
        };

        info!(
            stages = manifest.stages.len(),
            mode = %self.executor.mode(),
            taps = self.config.filter.tap_count(),
            "Starting pipeline"
        );

        let runner = StageRunner::new(self.executor.mode());
        let mut outcomes = Vec::with_capacity(manifest.stages.len());

        for stage in &manifest.stages {
            let mut tracker = StageTracker::new(&stage.name);

            if self.cancel.is_cancelled() {
                warn!(stage = %stage.name, "Run cancelled, stage not started");
                tracker.transition(StageState::Cancelled);
                outcomes.push(StageOutcome {
                    stage: stage.clone(),
                    state: tracker.state(),
                    result: Err(Error::Cancelled(stage.name.clone())),
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            tracker.transition(StageState::Running);
            let started = Instant::now();
            let result = runner.run(stage, self.executor.as_ref());
            let elapsed = started.elapsed();

            match &result {
                Ok(_) => {
                    tracker.transition(StageState::Succeeded);
                    info!(stage = %stage.name, "Stage succeeded");
                }
                Err(e) => {
                    tracker.transition(StageState::Failed);
                    error!(stage = %stage.name, kind = e.kind(), error = %e, "Stage failed, continuing");
                }
            }

            outcomes.push(StageOutcome {
                stage: stage.clone(),
                state: tracker.state(),
                result,
                elapsed,
            });
        }

        let run = PipelineRun {
            manifest,
            reference,
            outcomes,
            elapsed: run_started.elapsed(),
        };

        info!(
            succeeded = run.succeeded_count(),
            total = run.outcomes.len(),
            elapsed_ms = run.elapsed.as_millis() as u64,
            "Pipeline finished"
        );
        Ok(run)
    }
}
