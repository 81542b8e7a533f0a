use super::error::EngineError;
use crate::core::io::mmcif::MmcifFile;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::StructureFile;
use crate::core::models::structure::{Dialect, StructureRecord};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// A structure serialized to a temporary file for the engine to read.
///
/// The file is removed when the value is dropped.
#[derive(Debug)]
pub struct TransientStructure {
    file: NamedTempFile,
}

impl TransientStructure {
    /// Writes `record` in its own dialect to a fresh temporary file.
    pub fn write(record: &StructureRecord) -> Result<Self, EngineError> {
        let dialect = record.dialect();
        let file = tempfile::Builder::new()
            .prefix("stackalign-")
            .suffix(&format!(".{}", dialect.extension()))
            .tempfile()
            .map_err(EngineError::Materialize)?;

        {
            let mut writer = BufWriter::new(file.as_file());
            let written = match dialect {
                Dialect::Pdb => PdbFile::write_to(record, &mut writer).map_err(io::Error::other),
                Dialect::Mmcif => MmcifFile::write_to(record, &mut writer).map_err(io::Error::other),
            };
            written.map_err(EngineError::Materialize)?;
            writer.flush().map_err(EngineError::Materialize)?;
        }

        debug!(id = record.id(), path = %file.path().display(), "Wrote transient structure.");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{AtomRecord, ChainLabels};
    use nalgebra::Point3;
    use std::fs;

    fn record(dialect: Dialect) -> StructureRecord {
        let mut record = StructureRecord::new("1tmp", dialect);
        record.atoms_mut().push(AtomRecord::new(
            1,
            "CA",
            "GLY",
            1,
            ChainLabels::legacy("A"),
            Point3::new(1.0, 2.0, 3.0),
        ));
        record
    }

    #[test]
    fn file_uses_dialect_extension_and_reads_back() {
        let transient = TransientStructure::write(&record(Dialect::Pdb)).unwrap();
        assert_eq!(transient.path().extension().unwrap(), "pdb");
        let reread = PdbFile::read_from_path(transient.path()).unwrap();
        assert_eq!(reread.atoms().coordinates(), vec![Point3::new(1.0, 2.0, 3.0)]);

        let transient = TransientStructure::write(&record(Dialect::Mmcif)).unwrap();
        assert_eq!(transient.path().extension().unwrap(), "cif");
        assert!(fs::read_to_string(transient.path()).unwrap().contains("_atom_site.Cartn_x"));
    }

    #[test]
    fn file_is_removed_on_drop() {
        let transient = TransientStructure::write(&record(Dialect::Pdb)).unwrap();
        let path = transient.path().to_path_buf();
        assert!(path.exists());
        drop(transient);
        assert!(!path.exists());
    }
}
