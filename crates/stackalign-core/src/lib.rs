//! # StackAlign Core Library
//!
//! Keyed stacks of molecular structures and their superposition onto a common
//! reference with an external TM-score alignment engine.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`StructureRecord`), the
//!   PDB and mmCIF readers and writers, chain selection, rigid-body geometry and the
//!   structure stack with its bulk filter and calculation operations.
//!
//! - **[`engine`]: The Boundary.** Everything that touches the external aligner:
//!   configuration, transient structure files, process invocation with a timeout,
//!   report parsing and progress reporting. The aligner sits behind the
//!   `AlignmentEngine` trait so it can be replaced.
//!
//! - **[`workflows`]: The Public API.** The stack alignment workflow, which picks a
//!   target, drives the engine once per entry and applies the resulting transforms.

pub mod core;
pub mod engine;
pub mod workflows;
