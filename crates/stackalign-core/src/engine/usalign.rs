use super::AlignmentEngine;
use super::config::EngineConfig;
use super::error::{EngineError, ExecutionFailure};
use super::report::{Superposition, parse_report};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Executable names searched on `PATH`, in order.
pub const PROGRAM_NAMES: [&str; 2] = ["USalign", "TMalign"];

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long stderr is awaited once the engine has exited.
const GRACE: Duration = Duration::from_millis(200);

/// Runs a US-align compatible executable once per alignment.
#[derive(Debug, Clone)]
pub struct UsAlign {
    program: PathBuf,
    config: EngineConfig,
}

impl UsAlign {
    /// Locates the engine binary.
    ///
    /// An explicit `config.program` must exist; otherwise [`PROGRAM_NAMES`]
    /// are searched on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no executable could be located.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let program = match &config.program {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                return Err(EngineError::NotFound {
                    searched: path.display().to_string(),
                });
            }
            None => PROGRAM_NAMES
                .iter()
                .find_map(|name| which::which(name).ok())
                .ok_or_else(|| EngineError::NotFound {
                    searched: format!("{} on PATH", PROGRAM_NAMES.join(", ")),
                })?,
        };
        debug!(program = %program.display(), "Located alignment engine.");
        Ok(Self { program, config })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn execution_error(&self, failure: ExecutionFailure) -> EngineError {
        EngineError::Execution {
            program: self.program.clone(),
            failure,
        }
    }

    fn command(&self, mobile: &Path, target: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(mobile)
            .arg(target)
            .args(["-m", "-"])
            .args(&self.config.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

/// Reads `pipe` to the end on its own thread and delivers the text once.
///
/// A descendant of the engine may keep the pipe open after the engine exits,
/// so callers wait on the receiver with a deadline and may abandon it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn collect(output: &Receiver<String>, deadline: Instant) -> Option<String> {
    let wait = deadline
        .saturating_duration_since(Instant::now())
        .max(POLL_INTERVAL);
    output.recv_timeout(wait).ok()
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(error = %e, "Failed to kill engine process.");
    }
    let _ = child.wait();
}

/// Polls `child` until it exits or `deadline` passes, killing it in the latter case.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(child);
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            kill_and_reap(child);
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl AlignmentEngine for UsAlign {
    fn align(&self, mobile: &Path, target: &Path) -> Result<Superposition, EngineError> {
        debug!(
            mobile = %mobile.display(),
            target = %target.display(),
            "Invoking alignment engine."
        );

        let mut child = self
            .command(mobile, target)
            .spawn()
            .map_err(|e| self.execution_error(ExecutionFailure::Spawn(e)))?;
        let deadline = Instant::now() + self.config.timeout;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_until(&mut child, deadline)
            .map_err(|e| self.execution_error(ExecutionFailure::Spawn(e)))?;
        let timed_out = || {
            self.execution_error(ExecutionFailure::TimedOut {
                after: self.config.timeout,
            })
        };
        let Some(status) = status else {
            debug!("Engine timed out; abandoning its output pipes.");
            return Err(timed_out());
        };
        let Some(stdout) = collect(&stdout, deadline) else {
            return Err(timed_out());
        };
        let stderr = collect(&stderr, Instant::now() + GRACE).unwrap_or_default();

        if !status.success() {
            return Err(self.execution_error(ExecutionFailure::ExitStatus {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            }));
        }
        parse_report(&stdout, self.config.normalization)
    }
}
