//! # Core Module
//!
//! The stateless foundation of the library: structure models, file I/O,
//! chain selection, rigid-body geometry and the keyed structure stack.
//!
//! - **Molecular Representation** ([`models`]) - Atom rows, sections and structure records
//! - **File I/O** ([`io`]) - The PDB and mmCIF dialects and the structure loader
//! - **Chain Selection** ([`selection`]) - Chain column resolution and chain filters
//! - **Geometry** ([`geometry`]) - Transforms applied to coordinate arrays
//! - **Collections** ([`keyed`], [`stack`]) - Insertion-ordered maps and the structure stack

pub mod geometry;
pub mod io;
pub mod keyed;
pub mod models;
pub mod selection;
pub mod stack;
