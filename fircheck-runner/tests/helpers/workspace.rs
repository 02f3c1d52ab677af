//! Scratch artifact layout for pipeline tests

use fircheck_runner::{ArtifactLayout, FilterSpec, InputSource, PipelineConfig};
use fircheck_common::ExecutionMode;
use tempfile::TempDir;

/// Tap count small enough to keep tests fast
pub const TEST_TAPS: usize = 16;

pub struct Workspace {
    // Held for its Drop
    _dir: TempDir,
    pub config: PipelineConfig,
}

impl Workspace {
    /// Empty bin/ and out/ directories with a short seeded input
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("bin"), dir.path().join("out"));
        std::fs::create_dir_all(&layout.bin_dir).unwrap();

        let config = PipelineConfig {
            input_path: dir.path().join("wav").join("input.wav"),
            layout,
            input_source: InputSource::Generate,
            duration_secs: 0.01,
            sample_rate: 16_000,
            seed: Some(42),
            filter: FilterSpec::moving_average(TEST_TAPS),
            mode: ExecutionMode::Simulator,
            tolerance_lsb: 0,
        };

        Self { _dir: dir, config }
    }

    /// Create fake firmware images for `stages`
    pub fn with_firmware(self, stages: &[&str]) -> Self {
        for stage in stages {
            std::fs::write(self.config.layout.firmware_path(stage), b"\x7fELF").unwrap();
        }
        self
    }
}
