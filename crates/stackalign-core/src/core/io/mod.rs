//! Reading and writing structure files.
//!
//! Each supported dialect implements the [`traits::StructureFile`] interface;
//! [`loader`] picks the dialect for a source and maps failures into a single
//! [`loader::LoadError`].

pub mod loader;
pub mod mmcif;
pub mod pdb;
pub mod traits;
