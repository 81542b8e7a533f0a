use crate::cli::AlignArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use stackalign::engine::config::{EngineConfig, EngineConfigBuilder, ScoreNormalization};
use stackalign::workflows::align::{AlignOptions, TargetPolicy};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialEngineConfig {
    program: Option<PathBuf>,
    #[serde(rename = "timeout-seconds")]
    timeout_seconds: Option<u64>,
    #[serde(rename = "extra-args")]
    extra_args: Option<Vec<String>>,
    normalization: Option<ScoreNormalization>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialAlignmentConfig {
    target: Option<String>,
    #[serde(rename = "target-policy")]
    target_policy: Option<TargetPolicy>,
    chains: Option<HashMap<String, String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialAlignConfig {
    engine: Option<PartialEngineConfig>,
    alignment: Option<PartialAlignmentConfig>,
}

/// The engine settings and workflow options of one `align` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAlignConfig {
    pub engine: EngineConfig,
    pub options: AlignOptions,
}

/// Parses a `KEY=CHAIN` assignment.
pub fn parse_chain_assignment(value: &str) -> Result<(String, String)> {
    match value.split_once('=') {
        Some((key, chain)) if !key.trim().is_empty() && !chain.trim().is_empty() => {
            Ok((key.trim().to_string(), chain.trim().to_string()))
        }
        _ => Err(CliError::Argument(format!(
            "Invalid chain assignment '{}'. Expected KEY=CHAIN.",
            value
        ))),
    }
}

impl PartialAlignConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads the file named by `--config`, or starts from an empty config.
    pub fn load(args: &AlignArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Combines file values with command-line overrides; flags win.
    pub fn merge_with_cli(self, args: &AlignArgs) -> Result<ResolvedAlignConfig> {
        let engine_file = self.engine.unwrap_or_default();
        let alignment_file = self.alignment.unwrap_or_default();

        let mut builder = EngineConfigBuilder::new();
        if let Some(program) = args.engine.clone().or(engine_file.program) {
            builder = builder.program(program);
        }
        if let Some(seconds) = args.timeout.or(engine_file.timeout_seconds) {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        if let Some(extra_args) = engine_file.extra_args {
            builder = builder.extra_args(extra_args);
        }
        if let Some(normalization) = args
            .normalize_by
            .map(ScoreNormalization::from)
            .or(engine_file.normalization)
        {
            builder = builder.normalization(normalization);
        }
        let engine = builder.build()?;

        let mut chains = alignment_file.chains.unwrap_or_default();
        for assignment in &args.chains {
            let (key, chain) = parse_chain_assignment(assignment)?;
            chains.insert(key, chain);
        }

        let mut options = AlignOptions::new().mobile_chains(chains);
        if let Some(target) = args.target.clone().or(alignment_file.target) {
            options = options.target(target);
        }
        if let Some(policy) = args
            .target_policy
            .map(TargetPolicy::from)
            .or(alignment_file.target_policy)
        {
            options = options.target_policy(policy);
        }

        Ok(ResolvedAlignConfig { engine, options })
    }
}
