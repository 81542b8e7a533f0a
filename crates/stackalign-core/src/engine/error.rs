use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Alignment engine not found (searched: {searched})")]
    NotFound { searched: String },

    #[error("Alignment engine '{program}' failed: {failure}")]
    Execution {
        program: PathBuf,
        failure: ExecutionFailure,
    },

    #[error("Could not find '{missing}' in engine output: {snippet:?}")]
    OutputParse {
        missing: &'static str,
        snippet: String,
    },

    #[error("Failed to write transient structure file: {0}")]
    Materialize(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum ExecutionFailure {
    #[error("could not start process: {0}")]
    Spawn(#[source] io::Error),

    #[error("exited with {}: {stderr}", describe_exit(.code))]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("timed out after {after:?}")]
    TimedOut { after: Duration },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}
