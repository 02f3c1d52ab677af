//! Run configuration passed explicitly to the orchestrator
//!
//! Built from the TOML bootstrap file, then adjusted by CLI overrides. Nothing
//! in the pipeline reads the working directory or environment on its own.

use crate::reference::FilterSpec;
use crate::stage::ArtifactLayout;
use fircheck_common::{ExecutionMode, TomlConfig};
use std::path::PathBuf;

/// Where the shared input waveform comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Generate fresh noise (seeded if a seed is configured)
    Generate,
    /// Reuse the existing input artifact; generate only if it is absent
    ReuseExisting,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub layout: ArtifactLayout,
    pub input_path: PathBuf,
    pub input_source: InputSource,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub seed: Option<u64>,
    pub filter: FilterSpec,
    pub mode: ExecutionMode,
    pub tolerance_lsb: u64,
}

impl PipelineConfig {
    pub fn from_toml(config: &TomlConfig) -> Self {
        let pipeline = &config.pipeline;
        Self {
            layout: ArtifactLayout::new(&pipeline.bin_dir, &pipeline.out_dir),
            input_path: pipeline.input_wav.clone(),
            input_source: if pipeline.reuse_input {
                InputSource::ReuseExisting
            } else {
                InputSource::Generate
            },
            duration_secs: pipeline.duration_secs,
            sample_rate: pipeline.sample_rate,
            seed: pipeline.seed,
            filter: FilterSpec::moving_average(pipeline.tap_count),
            mode: config.executor.mode,
            tolerance_lsb: pipeline.tolerance_lsb,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}
