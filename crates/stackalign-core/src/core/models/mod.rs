//! Data models for molecular structures: atom rows, sections and records.

pub mod atom;
pub mod structure;
