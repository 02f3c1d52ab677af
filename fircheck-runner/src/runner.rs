//! Single-stage execution
//!
//! Runs one stage's firmware through a `HardwareExecutor` and reads back the
//! artifacts the firmware harness left behind.

use crate::executor::HardwareExecutor;
use crate::stage::{MetricsRecord, Stage, StageResult};
use fircheck_common::{Error, ExecutionMode, MissingFirmware, Result, Waveform};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// Runs stages in a fixed execution mode
#[derive(Debug, Clone, Copy)]
pub struct StageRunner {
    mode: ExecutionMode,
}

impl StageRunner {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Execute `stage` and collect its output waveform and timing metrics
    ///
    /// Executor failures are surfaced as-is and never retried: hardware state
    /// after a partial run is unknown.
    pub fn run(&self, stage: &Stage, executor: &dyn HardwareExecutor) -> Result<StageResult> {
        if !stage.firmware_path.exists() {
            return Err(Error::MissingArtifact {
                missing: vec![MissingFirmware {
                    stage: stage.name.clone(),
                    path: stage.firmware_path.clone(),
                }],
            });
        }

        prepare_artifact(&stage.name, &stage.output_path)?;
        prepare_artifact(&stage.name, &stage.metrics_path)?;

        info!(
            stage = %stage.name,
            firmware = %stage.firmware_path.display(),
            mode = %self.mode,
            "Running stage"
        );
        let started = Instant::now();

        if let Err(e) = executor.execute(&stage.firmware_path, self.mode) {
            error!(stage = %stage.name, error = %e, "Stage execution failed");
            return Err(Error::ExecutorFailure {
                stage: stage.name.clone(),
                message: e.to_string(),
            });
        }

        info!(
            stage = %stage.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stage execution finished"
        );

        for expected in [&stage.output_path, &stage.metrics_path] {
            if !expected.exists() {
                return Err(Error::MissingOutput {
                    stage: stage.name.clone(),
                    path: expected.clone(),
                });
            }
        }

        let output = Waveform::read_wav(&stage.output_path).map_err(|e| match e {
            Error::Wav(inner) => Error::MalformedArtifact {
                path: stage.output_path.clone(),
                message: inner.to_string(),
            },
            other => other,
        })?;
        let metrics = MetricsRecord::read_json(&stage.metrics_path)?;

        Ok(StageResult { output, metrics })
    }
}

/// Remove a leftover artifact from a previous run and make sure its directory exists
fn prepare_artifact(stage: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        warn!(stage = %stage, path = %path.display(), "Removing stale artifact");
        std::fs::remove_file(path)?;
    }
    Ok(())
}
