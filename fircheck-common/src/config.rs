//! Bootstrap configuration loading and config file resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (applied by the binary on top of the loaded file)
//! 2. `FIRCHECK_CONFIG` environment variable naming a TOML file
//! 3. `./fircheck.toml`
//! 4. `<config dir>/fircheck/config.toml`
//! 5. Built-in defaults
//!
//! A missing config file is not an error: a warning is logged and the
//! built-in defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "FIRCHECK_CONFIG";

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "fircheck.toml";

/// Where stage firmware is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Real hardware reached through a debug adapter
    #[default]
    Target,
    /// Instruction set simulator
    Simulator,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Target => write!(f, "target"),
            ExecutionMode::Simulator => write!(f, "simulator"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "target" | "hw" | "hardware" => Ok(ExecutionMode::Target),
            "simulator" | "sim" | "xsim" => Ok(ExecutionMode::Simulator),
            other => Err(Error::Config(format!("Unknown execution mode: {}", other))),
        }
    }
}

/// Complete TOML bootstrap configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    pub pipeline: PipelineSection,
    pub executor: ExecutorSection,
    pub logging: LoggingConfig,
}

/// `[pipeline]` section: artifact locations and signal/filter parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Directory holding `<stage>.xe` firmware images
    pub bin_dir: PathBuf,

    /// Directory receiving stage output waveforms, metrics and the summary
    pub out_dir: PathBuf,

    /// Input waveform consumed by every stage
    pub input_wav: PathBuf,

    /// Reuse `input_wav` if it already exists instead of generating a new one
    pub reuse_input: bool,

    /// Generated signal length in seconds
    pub duration_secs: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Generator seed (None = OS entropy)
    pub seed: Option<u64>,

    /// Reference filter length
    pub tap_count: usize,

    /// Largest absolute error (LSB) for a stage to count as passing
    pub tolerance_lsb: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            bin_dir: PathBuf::from("bin"),
            out_dir: PathBuf::from("out"),
            input_wav: PathBuf::from("wav/input.wav"),
            reuse_input: false,
            duration_secs: 1.0,
            sample_rate: 16_000,
            seed: None,
            tap_count: 1024,
            tolerance_lsb: 0,
        }
    }
}

/// `[executor]` section: launcher programs for target and simulator runs
///
/// Argument lists may contain `{firmware}` and `{adapter}` placeholders.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub mode: ExecutionMode,
    pub adapter_id: Option<String>,
    pub target_program: String,
    pub target_args: Vec<String>,
    pub simulator_program: String,
    pub simulator_args: Vec<String>,

    /// Directory the launcher runs in (firmware file I/O is relative to it)
    pub working_dir: Option<PathBuf>,

    /// Kill the launcher after this many seconds (None = wait forever)
    pub timeout_secs: Option<u64>,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Target,
            adapter_id: None,
            target_program: "xrun".to_string(),
            target_args: vec![
                "--adapter-id".to_string(),
                "{adapter}".to_string(),
                "--xscope".to_string(),
                "{firmware}".to_string(),
            ],
            simulator_program: "xsim".to_string(),
            simulator_args: vec!["{firmware}".to_string()],
            working_dir: None,
            timeout_secs: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e: toml::de::Error| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Resolve and load the config file, falling back to defaults when none exists
    ///
    /// An explicitly requested file (CLI or environment) that fails to parse is an
    /// error; a missing file only produces a warning.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading configuration");
                Self::from_file(&path)
            }
            Some(path) => {
                warn!(
                    path = %path.display(),
                    "Config file not found, using built-in defaults"
                );
                Ok(Self::default())
            }
            None => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Config file resolution following the priority order in the module docs
///
/// Returns the first candidate that was explicitly requested or exists on disk.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: working directory
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    // Priority 4: per-user config directory
    dirs::config_dir()
        .map(|d| d.join("fircheck").join("config.toml"))
        .filter(|p| p.exists())
}
