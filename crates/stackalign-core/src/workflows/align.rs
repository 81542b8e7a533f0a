use crate::core::geometry::Transform;
use crate::core::keyed::KeyedMap;
use crate::core::models::structure::StructureRecord;
use crate::core::selection::{ChainError, select_chain};
use crate::core::stack::StructureStack;
use crate::engine::AlignmentEngine;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::Superposition;
use crate::engine::transient::TransientStructure;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("Cannot align an empty stack")]
    EmptyStack,

    #[error("Target '{0}' is not in the stack")]
    TargetNotFound(String),

    #[error("Chain restriction failed for '{key}': {source}")]
    Chain {
        key: String,
        #[source]
        source: ChainError,
    },

    #[error("Alignment failed for '{key}': {source}")]
    Engine {
        key: String,
        #[source]
        source: EngineError,
    },

    #[error("No transform computed for '{0}'")]
    MissingTransform(String),
}

/// How the reference structure is chosen when none is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetPolicy {
    /// The smallest key in byte-wise lexicographic order, independent of stack order.
    #[default]
    Lexicographic,
    /// The first entry in stack order.
    First,
    /// The entry with the most `ATOM` rows; the earliest wins ties.
    Largest,
}

impl TargetPolicy {
    fn select<'s>(&self, stack: &'s StructureStack) -> Option<&'s str> {
        match self {
            TargetPolicy::Lexicographic => stack.keys().min(),
            TargetPolicy::First => stack.first_key(),
            TargetPolicy::Largest => stack
                .iter()
                .fold(None, |best: Option<(&str, usize)>, (key, record)| {
                    let size = record.atoms().len();
                    match best {
                        Some((_, best_size)) if best_size >= size => best,
                        _ => Some((key, size)),
                    }
                })
                .map(|(key, _)| key),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignOptions {
    pub target: Option<String>,
    pub target_policy: TargetPolicy,
    /// Chain each entry is restricted to while it is being aligned.
    pub mobile_chains: HashMap<String, String>,
}

impl AlignOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, key: impl Into<String>) -> Self {
        self.target = Some(key.into());
        self
    }
    pub fn target_policy(mut self, policy: TargetPolicy) -> Self {
        self.target_policy = policy;
        self
    }
    pub fn chain(mut self, key: impl Into<String>, chain: impl Into<String>) -> Self {
        self.mobile_chains.insert(key.into(), chain.into());
        self
    }
    pub fn mobile_chains(mut self, chains: HashMap<String, String>) -> Self {
        self.mobile_chains = chains;
        self
    }
}

/// The transforms, superposed structures and scores of one stack alignment.
#[derive(Debug, Clone)]
pub struct StackAlignment {
    pub target: String,
    pub transforms: KeyedMap<Transform>,
    pub structures: StructureStack,
    pub scores: KeyedMap<f64>,
    /// Engine reports for every entry except the target.
    pub reports: KeyedMap<Superposition>,
}

impl StackAlignment {
    /// Applies the stored transforms to the entries of `stack`, by key.
    ///
    /// # Errors
    ///
    /// Returns [`AlignError::MissingTransform`] for a key this alignment did not cover.
    pub fn apply_to(&self, stack: &StructureStack) -> Result<StructureStack, AlignError> {
        stack
            .iter()
            .map(|(key, record)| {
                let transform = self
                    .transforms
                    .get(key)
                    .ok_or_else(|| AlignError::MissingTransform(key.to_string()))?;
                Ok::<_, AlignError>((key.to_string(), record.transformed(transform)))
            })
            .collect()
    }

    /// Scores sorted from best to worst; equal scores keep stack order.
    pub fn ranked_scores(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.scores.iter().map(|(k, s)| (k, *s)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

struct EntryOutcome {
    key: String,
    transform: Transform,
    structure: StructureRecord,
    report: Option<Superposition>,
}

impl EntryOutcome {
    fn score(&self) -> f64 {
        self.report.map_or(1.0, |r| r.score)
    }
}

fn restrict<'r>(
    key: &str,
    record: &'r StructureRecord,
    options: &AlignOptions,
) -> Result<std::borrow::Cow<'r, StructureRecord>, AlignError> {
    match options.mobile_chains.get(key) {
        Some(chain) => select_chain(record, chain)
            .map(std::borrow::Cow::Owned)
            .map_err(|source| AlignError::Chain {
                key: key.to_string(),
                source,
            }),
        None => Ok(std::borrow::Cow::Borrowed(record)),
    }
}

fn align_entry(
    key: &str,
    record: &StructureRecord,
    target_key: &str,
    target_path: &Path,
    engine: &dyn AlignmentEngine,
    options: &AlignOptions,
) -> Result<EntryOutcome, AlignError> {
    let restricted = restrict(key, record, options)?;

    if key == target_key {
        return Ok(EntryOutcome {
            key: key.to_string(),
            transform: Transform::identity(),
            structure: restricted.into_owned(),
            report: None,
        });
    }

    let engine_error = |source| AlignError::Engine {
        key: key.to_string(),
        source,
    };
    let mobile = TransientStructure::write(&restricted).map_err(engine_error)?;
    debug!(%key, mobile = %mobile.path().display(), "Aligning entry onto target.");
    let report = engine
        .align(mobile.path(), target_path)
        .map_err(engine_error)?;

    Ok(EntryOutcome {
        key: key.to_string(),
        transform: report.transform,
        structure: record.transformed(&report.transform),
        report: Some(report),
    })
}

/// Superposes every entry of `stack` onto a single target.
///
/// The target is `options.target` when given, otherwise the entry chosen by
/// `options.target_policy` (by default the lexicographically smallest key). Entries listed in `options.mobile_chains` are
/// restricted to that chain for the engine call, but the resulting transform
/// is applied to the full record. The target itself is never sent to the
/// engine: it scores 1.0 with the identity transform.
///
/// # Errors
///
/// Returns the first failure, tagged with the key of the entry it occurred on.
#[instrument(skip_all, name = "align_workflow")]
pub fn run(
    stack: &StructureStack,
    engine: &dyn AlignmentEngine,
    options: &AlignOptions,
    reporter: &ProgressReporter,
) -> Result<StackAlignment, AlignError> {
    if stack.is_empty() {
        return Err(AlignError::EmptyStack);
    }
    let target_key = match &options.target {
        Some(key) if stack.contains_key(key) => key.as_str(),
        Some(key) => return Err(AlignError::TargetNotFound(key.clone())),
        None => options
            .target_policy
            .select(stack)
            .ok_or(AlignError::EmptyStack)?,
    };
    info!(
        target = target_key,
        entries = stack.len(),
        "Selected alignment target."
    );

    let target_record = stack
        .get(target_key)
        .ok_or_else(|| AlignError::TargetNotFound(target_key.to_string()))?;
    let target_restricted = restrict(target_key, target_record, options)?;
    let target_file = TransientStructure::write(&target_restricted).map_err(|source| {
        AlignError::Engine {
            key: target_key.to_string(),
            source,
        }
    })?;

    reporter.start_task("Aligning Structures", stack.len() as u64);
    reporter.report(Progress::Message(format!("Target: {}", target_key)));

    let process = |(key, record): (&str, &StructureRecord)| {
        let outcome = align_entry(
            key,
            record,
            target_key,
            target_file.path(),
            engine,
            options,
        )?;
        reporter.report(Progress::EntryAligned {
            key: outcome.key.clone(),
            score: outcome.score(),
        });
        reporter.report(Progress::TaskIncrement);
        Ok::<_, AlignError>(outcome)
    };

    #[cfg(not(feature = "parallel"))]
    let outcomes: Result<Vec<EntryOutcome>, AlignError> = stack.iter().map(process).collect();

    #[cfg(feature = "parallel")]
    let outcomes: Result<Vec<EntryOutcome>, AlignError> = {
        let entries: Vec<(&str, &StructureRecord)> = stack.iter().collect();
        entries.into_par_iter().map(process).collect()
    };

    let outcomes = outcomes?;
    reporter.finish_task();

    let mut transforms = KeyedMap::with_capacity(outcomes.len());
    let mut scores = KeyedMap::with_capacity(outcomes.len());
    let mut reports = KeyedMap::new();
    for outcome in &outcomes {
        transforms.insert(outcome.key.as_str(), outcome.transform);
        scores.insert(outcome.key.as_str(), outcome.score());
        if let Some(report) = outcome.report {
            reports.insert(outcome.key.as_str(), report);
        }
    }
    let structures: StructureStack = outcomes
        .into_iter()
        .map(|outcome| (outcome.key, outcome.structure))
        .collect();

    let alignment = StackAlignment {
        target: target_key.to_string(),
        transforms,
        structures,
        scores,
        reports,
    };

    info!(
        "Alignment complete. Superposed {} structure(s) onto '{}'.",
        alignment.structures.len(),
        alignment.target
    );
    Ok(alignment)
}
