//! Stage definitions and artifact layout
//!
//! A stage is one firmware build under test. Its artifacts live at
//! deterministic, stage-scoped paths so that no two stages share a file:
//!
//! - firmware: `<bin_dir>/<stage>.xe`
//! - output waveform: `<out_dir>/output-<stage>.wav`
//! - timing metrics: `<out_dir>/<stage>.json`

use fircheck_common::{Error, Result, Waveform};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Firmware image extension produced by the firmware build
pub const FIRMWARE_EXTENSION: &str = "xe";

/// One pipeline step: a firmware image plus the artifacts it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub firmware_path: PathBuf,
    pub output_path: PathBuf,
    pub metrics_path: PathBuf,
}

/// Maps stage names to artifact paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub bin_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(bin_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn firmware_path(&self, stage: &str) -> PathBuf {
        self.bin_dir
            .join(format!("{}.{}", stage, FIRMWARE_EXTENSION))
    }

    pub fn output_path(&self, stage: &str) -> PathBuf {
        self.out_dir.join(format!("output-{}.wav", stage))
    }

    pub fn metrics_path(&self, stage: &str) -> PathBuf {
        self.out_dir.join(format!("{}.json", stage))
    }

    /// Reference filter output written alongside stage outputs
    pub fn reference_path(&self) -> PathBuf {
        self.out_dir.join("reference.wav")
    }

    /// Validation summary written at the end of a run
    pub fn summary_path(&self) -> PathBuf {
        self.out_dir.join("summary.json")
    }

    pub fn resolve(&self, stage: &str) -> Stage {
        Stage {
            name: stage.to_string(),
            firmware_path: self.firmware_path(stage),
            output_path: self.output_path(stage),
            metrics_path: self.metrics_path(stage),
        }
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new("bin", "out")
    }
}

/// Timing telemetry reported by a stage's firmware
///
/// Values are nanoseconds and may be fractional (the firmware averages over
/// many frames).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Average time to filter one sample through all taps (ns)
    #[serde(rename = "filter_time")]
    pub filter_time_ns: f64,

    /// Average time per tap (ns)
    #[serde(rename = "tap_time")]
    pub tap_time_ns: f64,
}

impl MetricsRecord {
    pub fn new(filter_time_ns: f64, tap_time_ns: f64) -> Self {
        Self {
            filter_time_ns,
            tap_time_ns,
        }
    }

    /// Filter time as a `Duration`, `None` if it does not fit
    pub fn filter_time(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.filter_time_ns / 1e9).ok()
    }

    /// Tap time as a `Duration`, `None` if it does not fit
    pub fn tap_time(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.tap_time_ns / 1e9).ok()
    }

    /// Load a metrics artifact
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let record: MetricsRecord =
            serde_json::from_str(&content).map_err(|e| Error::MalformedArtifact {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(record.filter_time_ns) || !valid(record.tap_time_ns) {
            return Err(Error::MalformedArtifact {
                path: path.to_path_buf(),
                message: format!(
                    "timing values must be non-negative (filter_time={}, tap_time={})",
                    record.filter_time_ns, record.tap_time_ns
                ),
            });
        }
        Ok(record)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::MalformedArtifact {
            path: path.as_ref().to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Artifacts captured from one successful stage execution
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    pub output: Waveform,
    pub metrics: MetricsRecord,
}
