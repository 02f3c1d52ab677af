//! Common error types for fircheck

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Common result type for fircheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// A stage whose firmware image was not found during pre-flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFirmware {
    pub stage: String,
    pub path: PathBuf,
}

impl fmt::Display for MissingFirmware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.stage, self.path.display())
    }
}

fn join_missing(missing: &[MissingFirmware]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error taxonomy shared by the generator, reference filter, runner and orchestrator
#[derive(Error, Debug)]
pub enum Error {
    /// Bad generator, filter or comparison parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Firmware image(s) absent; lists every missing stage, not just the first
    #[error("Firmware not found for {}. Did you build and install?", join_missing(.missing))]
    MissingArtifact { missing: Vec<MissingFirmware> },

    /// External launcher reported failure (non-zero exit, spawn error, timeout)
    #[error("Executor failed for {stage}: {message}")]
    ExecutorFailure { stage: String, message: String },

    /// Launcher reported success but an expected artifact was not written
    #[error("Expected output for {stage} not found: {}", .path.display())]
    MissingOutput { stage: String, path: PathBuf },

    /// Artifact exists but could not be decoded
    #[error("Malformed artifact {}: {message}", .path.display())]
    MalformedArtifact { path: PathBuf, message: String },

    /// Stage never started because the run was cancelled
    #[error("Cancelled before {0} started")]
    Cancelled(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV encode/decode error (wraps hound::Error)
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl Error {
    /// Stable short name used in summaries and JSON reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidParameter(_) => "invalid_parameter",
            Error::MissingArtifact { .. } => "missing_artifact",
            Error::ExecutorFailure { .. } => "executor_failure",
            Error::MissingOutput { .. } => "missing_output",
            Error::MalformedArtifact { .. } => "malformed_artifact",
            Error::Cancelled(_) => "cancelled",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Wav(_) => "wav",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_names_every_stage() {
        let err = Error::MissingArtifact {
            missing: vec![
                MissingFirmware {
                    stage: "stage1".to_string(),
                    path: PathBuf::from("bin/stage1.xe"),
                },
                MissingFirmware {
                    stage: "stage4".to_string(),
                    path: PathBuf::from("bin/stage4.xe"),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("stage1 (bin/stage1.xe)"));
        assert!(message.contains("stage4 (bin/stage4.xe)"));
        assert_eq!(err.kind(), "missing_artifact");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err.kind(), "io");
    }
}
