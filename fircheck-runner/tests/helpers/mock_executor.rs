//! Scripted executor that emulates firmware stages without hardware

use fircheck_common::{ExecutionMode, Waveform};
use fircheck_runner::executor::{ExecutorError, HardwareExecutor};
use fircheck_runner::{ArtifactLayout, CancellationFlag, FilterSpec, MetricsRecord, ReferenceFilter};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Stage names in the order the executor was invoked
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// What the mock does when asked to run a given stage
#[derive(Debug, Clone)]
pub enum StageBehavior {
    /// Write a bit-exact filter output and the given filter time (ns)
    Exact { filter_time_ns: f64 },
    /// Like `Exact` but add `offset` to every output sample
    Offset { offset: i32, filter_time_ns: f64 },
    /// Write only the first `len` samples of the exact output
    Truncated { len: usize },
    /// Launcher reports a failure, no artifacts written
    Fail,
    /// Exit cleanly without writing anything
    Silent,
    /// Behave like `Exact`, then raise the cancellation flag
    CancelAfter { cancel: CancellationFlag },
}

pub struct MockExecutor {
    layout: ArtifactLayout,
    input_path: PathBuf,
    filter: FilterSpec,
    behaviors: HashMap<String, StageBehavior>,
    calls: CallLog,
}

impl MockExecutor {
    pub fn new(layout: ArtifactLayout, input_path: impl Into<PathBuf>, filter: FilterSpec) -> Self {
        Self {
            layout,
            input_path: input_path.into(),
            filter,
            behaviors: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_behavior(mut self, stage: &str, behavior: StageBehavior) -> Self {
        self.behaviors.insert(stage.to_string(), behavior);
        self
    }

    /// Shared handle to the call log; stays valid after the executor is boxed
    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    fn exact_output(&self) -> Result<Waveform, ExecutorError> {
        let input = Waveform::read_wav(&self.input_path)
            .map_err(|e| ExecutorError::Hardware(format!("cannot read input: {}", e)))?;
        ReferenceFilter::compute(&input, &self.filter)
            .map_err(|e| ExecutorError::Hardware(e.to_string()))
    }

    fn write_artifacts(&self, stage: &str, output: &Waveform, filter_time_ns: f64) -> Result<(), ExecutorError> {
        output
            .write_wav(self.layout.output_path(stage))
            .map_err(|e| ExecutorError::Hardware(e.to_string()))?;
        let tap_time_ns = filter_time_ns / self.filter.tap_count() as f64;
        MetricsRecord::new(filter_time_ns, tap_time_ns)
            .write_json(self.layout.metrics_path(stage))
            .map_err(|e| ExecutorError::Hardware(e.to_string()))
    }
}

impl HardwareExecutor for MockExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Simulator
    }

    fn execute(&self, firmware: &Path, _mode: ExecutionMode) -> Result<(), ExecutorError> {
        let stage = firmware
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(stage.clone());

        let behavior = self
            .behaviors
            .get(&stage)
            .cloned()
            .unwrap_or(StageBehavior::Exact { filter_time_ns: 1000.0 });

        match behavior {
            StageBehavior::Exact { filter_time_ns } => {
                let output = self.exact_output()?;
                self.write_artifacts(&stage, &output, filter_time_ns)
            }
            StageBehavior::Offset { offset, filter_time_ns } => {
                let exact = self.exact_output()?;
                let shifted = exact
                    .samples()
                    .iter()
                    .map(|s| s.saturating_add(offset))
                    .collect();
                let output = Waveform::new(exact.sample_rate(), shifted);
                self.write_artifacts(&stage, &output, filter_time_ns)
            }
            StageBehavior::Truncated { len } => {
                let exact = self.exact_output()?;
                let output = Waveform::new(exact.sample_rate(), exact.samples()[..len].to_vec());
                self.write_artifacts(&stage, &output, 1000.0)
            }
            StageBehavior::Fail => Err(ExecutorError::Exited {
                code: Some(1),
                stderr: format!("{}: xCORE not responding", stage),
            }),
            StageBehavior::Silent => Ok(()),
            StageBehavior::CancelAfter { cancel } => {
                let output = self.exact_output()?;
                self.write_artifacts(&stage, &output, 1000.0)?;
                cancel.cancel();
                Ok(())
            }
        }
    }
}
