//! # Engine Module
//!
//! The stateful boundary between the library and the external structural
//! aligner. Structures are materialized into transient files, the engine
//! process is run once per pair, and its report is parsed back into a
//! [`report::Superposition`].
//!
//! - **Configuration** ([`config`]) - Engine location, timeout, extra arguments and score normalization
//! - **Invocation** ([`usalign`]) - Process execution with a timeout
//! - **Report Parsing** ([`report`]) - Rotation, translation and scores from engine output
//! - **Transient Files** ([`transient`]) - Temporary structure files removed on drop
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod config;
pub mod error;
pub mod progress;
pub mod report;
pub mod transient;
pub mod usalign;

use error::EngineError;
use report::Superposition;
use std::path::Path;

/// A structural aligner that superposes `mobile` onto `target`.
///
/// Both paths point to structure files the engine can read. Implementations
/// must be shareable across threads so a stack can be aligned in parallel.
pub trait AlignmentEngine: Send + Sync {
    fn align(&self, mobile: &Path, target: &Path) -> Result<Superposition, EngineError>;
}
