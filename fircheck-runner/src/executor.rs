//! Hardware/simulator execution capability
//!
//! The pipeline never talks to hardware itself. It hands a firmware image to a
//! `HardwareExecutor`, which runs an external launcher program and blocks until
//! that program exits. Two implementations are provided and selected from
//! configuration by [`executor_for`]:
//!
//! - [`TargetExecutor`]: real device behind a debug adapter (`xrun`-style launcher)
//! - [`SimulatorExecutor`]: instruction set simulator (`xsim`-style launcher)

use fircheck_common::config::ExecutorSection;
use fircheck_common::{Error, ExecutionMode};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Poll interval while waiting on a launcher with a timeout
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Executor errors
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Launcher binary not found in PATH
    #[error("Launcher not found: {0}")]
    LauncherNotFound(String),

    /// Failed to start or wait on the launcher
    #[error("Failed to run launcher: {0}")]
    Spawn(String),

    /// Launcher exited unsuccessfully
    #[error("Launcher exited with code {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },

    /// Launcher exceeded the configured timeout and was killed
    #[error("Launcher timed out after {0:?}")]
    TimedOut(Duration),

    /// Executor asked to run in a mode it does not implement
    #[error("{available} executor cannot run in {requested} mode")]
    ModeMismatch {
        available: ExecutionMode,
        requested: ExecutionMode,
    },

    /// Device-level failure reported by an executor implementation
    #[error("Hardware error: {0}")]
    Hardware(String),
}

/// Capability to run one firmware image to completion
pub trait HardwareExecutor: Send + Sync {
    /// Mode this executor implements
    fn mode(&self) -> ExecutionMode;

    /// Run `firmware` and block until the launcher signals completion or failure
    fn execute(&self, firmware: &Path, mode: ExecutionMode) -> Result<(), ExecutorError>;
}

/// External launcher invocation with `{firmware}` / `{adapter}` argument templates
#[derive(Debug, Clone)]
pub struct LauncherCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl LauncherCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            timeout: None,
        }
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments with placeholders substituted
    pub fn render_args(&self, firmware: &Path, adapter: Option<&str>) -> Vec<String> {
        let firmware = firmware.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{firmware}", &firmware)
                    .replace("{adapter}", adapter.unwrap_or(""))
            })
            .collect()
    }

    /// Spawn the launcher and wait for it
    ///
    /// Launcher stdout is passed through so firmware progress output stays
    /// visible; stderr is captured for the error message.
    pub fn run(&self, firmware: &Path, adapter: Option<&str>) -> Result<(), ExecutorError> {
        let args = self.render_args(firmware, adapter);
        debug!(program = %self.program, args = ?args, "Spawning launcher");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        // Own process group: a terminal Ctrl+C must not reach a stage that is already running
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExecutorError::LauncherNotFound(self.program.clone())
            } else {
                ExecutorError::Spawn(e.to_string())
            }
        })?;

        // Drain stderr on a separate thread so a chatty launcher cannot block on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let status = match self.timeout {
            None => child
                .wait()
                .map_err(|e| ExecutorError::Spawn(e.to_string()))?,
            Some(timeout) => match wait_with_timeout(&mut child, timeout)? {
                Some(status) => status,
                None => {
                    warn!(program = %self.program, ?timeout, "Launcher timed out, killing");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExecutorError::TimedOut(timeout));
                }
            },
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(ExecutorError::Exited {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}

fn wait_with_timeout(
    child: &mut std::process::Child,
    timeout: Duration,
) -> Result<Option<ExitStatus>, ExecutorError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) if Instant::now() >= deadline => return Ok(None),
            Ok(None) => std::thread::sleep(WAIT_POLL_INTERVAL),
            Err(e) => return Err(ExecutorError::Spawn(e.to_string())),
        }
    }
}

/// Runs firmware on a physical device through a debug adapter
#[derive(Debug, Clone)]
pub struct TargetExecutor {
    launcher: LauncherCommand,
    adapter_id: String,
}

impl TargetExecutor {
    pub fn new(launcher: LauncherCommand, adapter_id: impl Into<String>) -> Self {
        Self {
            launcher,
            adapter_id: adapter_id.into(),
        }
    }

    pub fn adapter_id(&self) -> &str {
        &self.adapter_id
    }
}

impl HardwareExecutor for TargetExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Target
    }

    fn execute(&self, firmware: &Path, mode: ExecutionMode) -> Result<(), ExecutorError> {
        if mode != ExecutionMode::Target {
            return Err(ExecutorError::ModeMismatch {
                available: ExecutionMode::Target,
                requested: mode,
            });
        }
        self.launcher.run(firmware, Some(&self.adapter_id))
    }
}

/// Runs firmware in the instruction set simulator
#[derive(Debug, Clone)]
pub struct SimulatorExecutor {
    launcher: LauncherCommand,
}

impl SimulatorExecutor {
    pub fn new(launcher: LauncherCommand) -> Self {
        Self { launcher }
    }
}

impl HardwareExecutor for SimulatorExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Simulator
    }

    fn execute(&self, firmware: &Path, mode: ExecutionMode) -> Result<(), ExecutorError> {
        if mode != ExecutionMode::Simulator {
            return Err(ExecutorError::ModeMismatch {
                available: ExecutionMode::Simulator,
                requested: mode,
            });
        }
        self.launcher.run(firmware, None)
    }
}

/// Build the executor selected by configuration
///
/// Target mode requires an adapter id.
pub fn executor_for(config: &ExecutorSection) -> fircheck_common::Result<Box<dyn HardwareExecutor>> {
    let timeout = config.timeout_secs.map(Duration::from_secs);

    match config.mode {
        ExecutionMode::Target => {
            let adapter = config.adapter_id.clone().ok_or_else(|| {
                Error::Config("target execution requires an adapter id".to_string())
            })?;
            let launcher = LauncherCommand::new(&config.target_program, config.target_args.clone())
                .with_working_dir(config.working_dir.clone())
                .with_timeout(timeout);
            Ok(Box::new(TargetExecutor::new(launcher, adapter)))
        }
        ExecutionMode::Simulator => {
            let launcher =
                LauncherCommand::new(&config.simulator_program, config.simulator_args.clone())
                    .with_working_dir(config.working_dir.clone())
                    .with_timeout(timeout);
            Ok(Box::new(SimulatorExecutor::new(launcher)))
        }
    }
}
