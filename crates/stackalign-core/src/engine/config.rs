use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Engine timeout must be greater than zero")]
    InvalidTimeout,
}

/// Which structure's length the reported similarity score is normalized by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreNormalization {
    /// The structure being moved (`Structure_1` in the engine report).
    #[default]
    Mobile,
    /// The reference structure (`Structure_2` in the engine report).
    Target,
}

impl ScoreNormalization {
    pub(crate) fn report_label(&self) -> &'static str {
        match self {
            ScoreNormalization::Mobile => "Structure_1",
            ScoreNormalization::Target => "Structure_2",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Explicit engine executable; `None` searches `PATH`.
    pub program: Option<PathBuf>,
    pub timeout: Duration,
    pub extra_args: Vec<String>,
    pub normalization: ScoreNormalization,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: None,
            timeout: DEFAULT_TIMEOUT,
            extra_args: Vec::new(),
            normalization: ScoreNormalization::default(),
        }
    }
}

#[derive(Default)]
pub struct EngineConfigBuilder {
    program: Option<PathBuf>,
    timeout: Option<Duration>,
    extra_args: Vec<String>,
    normalization: Option<ScoreNormalization>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(mut self, path: PathBuf) -> Self {
        self.program = Some(path);
        self
    }
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
    pub fn normalization(mut self, normalization: ScoreNormalization) -> Self {
        self.normalization = Some(normalization);
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(EngineConfig {
            program: self.program,
            timeout,
            extra_args: self.extra_args,
            normalization: self.normalization.unwrap_or_default(),
        })
    }
}
