use super::mmcif::{MmcifError, MmcifFile};
use super::pdb::{PdbError, PdbFile};
use super::traits::StructureFile;
use crate::core::models::structure::{Dialect, StructureRecord};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse PDB file '{path}': {source}")]
    Pdb {
        path: PathBuf,
        #[source]
        source: PdbError,
    },
    #[error("Failed to parse mmCIF file '{path}': {source}")]
    Mmcif {
        path: PathBuf,
        #[source]
        source: MmcifError,
    },
    #[error("Unrecognized structure file extension for '{0}'")]
    UnknownFormat(PathBuf),
    #[error("Accession '{0}' is not available locally")]
    AccessionUnavailable(String),
}

/// The two accession namespaces a structure can be requested by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessionKind {
    /// A 4-character Protein Data Bank code, e.g. `1ycr`.
    Pdb,
    /// A UniProt accession, served as a predicted model, e.g. `P04637`.
    UniProt,
}

impl AccessionKind {
    /// Classifies `id`, returning `None` if it matches neither namespace.
    pub fn classify(id: &str) -> Option<Self> {
        if is_pdb_code(id) {
            Some(Self::Pdb)
        } else if is_uniprot_accession(id) {
            Some(Self::UniProt)
        } else {
            None
        }
    }
}

fn is_pdb_code(id: &str) -> bool {
    let bytes = id.as_bytes();
    bytes.len() == 4
        && bytes[0].is_ascii_digit()
        && bytes[1..].iter().all(u8::is_ascii_alphanumeric)
}

// [OPQ][0-9][A-Z0-9]{3}[0-9] | [A-NR-Z][0-9]([A-Z][A-Z0-9]{2}[0-9]){1,2}
fn is_uniprot_accession(id: &str) -> bool {
    let upper = id.to_ascii_uppercase();
    let b = upper.as_bytes();
    let digit = |c: u8| c.is_ascii_digit();
    let alpha = |c: u8| c.is_ascii_uppercase();
    let alnum = |c: u8| digit(c) || alpha(c);

    match b.len() {
        6 if matches!(b[0], b'O' | b'P' | b'Q') => {
            digit(b[1]) && b[2..5].iter().all(|&c| alnum(c)) && digit(b[5])
        }
        6 | 10 if alpha(b[0]) && !matches!(b[0], b'O' | b'P' | b'Q') => {
            digit(b[1])
                && b[2..].chunks(4).all(|block| {
                    alpha(block[0]) && alnum(block[1]) && alnum(block[2]) && digit(block[3])
                })
        }
        _ => false,
    }
}

fn dialect_for_path(path: &Path) -> Option<Dialect> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    match ext.as_str() {
        "pdb" | "ent" => Some(Dialect::Pdb),
        "cif" | "mmcif" => Some(Dialect::Mmcif),
        _ => None,
    }
}

/// Where a structure comes from: a local file or a database accession.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureSource {
    File(PathBuf),
    Accession(String),
}

impl StructureSource {
    /// Interprets a user-supplied string.
    ///
    /// An existing path or a path with a structure file extension is a file;
    /// otherwise a PDB code or UniProt accession is an accession. Anything else
    /// is treated as a file so the loader reports it.
    pub fn parse(input: &str) -> Self {
        let path = Path::new(input);
        if path.exists() || dialect_for_path(path).is_some() {
            return Self::File(path.to_path_buf());
        }
        match AccessionKind::classify(input) {
            Some(_) => Self::Accession(input.to_string()),
            None => Self::File(path.to_path_buf()),
        }
    }

    /// The stack key used when none is given: the file stem, or the accession as written.
    pub fn default_key(&self) -> String {
        match self {
            Self::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            Self::Accession(id) => id.clone(),
        }
    }
}

impl fmt::Display for StructureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Accession(id) => f.write_str(id),
        }
    }
}

/// Resolves a [`StructureSource`] into a parsed structure.
pub trait StructureLoader {
    fn load(&self, source: &StructureSource) -> Result<StructureRecord, LoadError>;
}

/// Reads structures from the local filesystem.
///
/// Accessions resolve to `<accession_dir>/<CODE>.pdb` or `<CODE>.cif`, in upper
/// or lower case, when an accession directory is configured.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    accession_dir: Option<PathBuf>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accession_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            accession_dir: Some(dir.into()),
        }
    }

    pub fn accession_dir(&self) -> Option<&Path> {
        self.accession_dir.as_deref()
    }

    /// Finds the local file holding `accession`, if any.
    pub fn locate_accession(&self, accession: &str) -> Option<PathBuf> {
        let dir = self.accession_dir.as_ref()?;
        let names = [accession.to_ascii_uppercase(), accession.to_ascii_lowercase()];
        ["pdb", "cif"]
            .iter()
            .flat_map(|ext| names.iter().map(move |name| dir.join(format!("{name}.{ext}"))))
            .find(|candidate| candidate.is_file())
    }

    /// Reads a structure file, choosing the dialect from its extension.
    pub fn read_path(path: &Path) -> Result<StructureRecord, LoadError> {
        let dialect =
            dialect_for_path(path).ok_or_else(|| LoadError::UnknownFormat(path.to_path_buf()))?;
        if !path.is_file() {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            });
        }
        debug!(path = %path.display(), ?dialect, "Reading structure file.");
        match dialect {
            Dialect::Pdb => PdbFile::read_from_path(path).map_err(|source| LoadError::Pdb {
                path: path.to_path_buf(),
                source,
            }),
            Dialect::Mmcif => MmcifFile::read_from_path(path).map_err(|source| LoadError::Mmcif {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl StructureLoader for FileLoader {
    fn load(&self, source: &StructureSource) -> Result<StructureRecord, LoadError> {
        match source {
            StructureSource::File(path) => Self::read_path(path),
            StructureSource::Accession(id) => {
                let path = self
                    .locate_accession(id)
                    .ok_or_else(|| LoadError::AccessionUnavailable(id.clone()))?;
                let mut record = Self::read_path(&path)?;
                record.set_id(id.clone());
                Ok(record)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PDB_TEXT: &str = "\
ATOM      1  CA  MET A   1      27.340  24.430   2.614  1.00  9.67           C
END
";

    #[test]
    fn classifies_accessions() {
        assert_eq!(AccessionKind::classify("1ycr"), Some(AccessionKind::Pdb));
        assert_eq!(AccessionKind::classify("3EIY"), Some(AccessionKind::Pdb));
        assert_eq!(AccessionKind::classify("P99999"), Some(AccessionKind::UniProt));
        assert_eq!(AccessionKind::classify("A0A023GPI8"), Some(AccessionKind::UniProt));
        assert_eq!(AccessionKind::classify("abcd"), None);
        assert_eq!(AccessionKind::classify("hello"), None);
    }

    #[test]
    fn parse_distinguishes_files_and_accessions() {
        assert_eq!(
            StructureSource::parse("data/1ycr.pdb"),
            StructureSource::File(PathBuf::from("data/1ycr.pdb"))
        );
        assert_eq!(
            StructureSource::parse("2d7t"),
            StructureSource::Accession("2d7t".into())
        );
        assert!(matches!(
            StructureSource::parse("not-a-thing"),
            StructureSource::File(_)
        ));
    }

    #[test]
    fn default_key_uses_stem_or_accession() {
        assert_eq!(StructureSource::parse("x/y/1ycr.cif").default_key(), "1ycr");
        assert_eq!(StructureSource::Accession("3EIY".into()).default_key(), "3EIY");
    }

    #[test]
    fn loads_file_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1abc.pdb");
        fs::write(&path, PDB_TEXT).unwrap();

        let record = FileLoader::new().load(&StructureSource::File(path)).unwrap();
        assert_eq!(record.id(), "1abc");
        assert_eq!(record.dialect(), Dialect::Pdb);
        assert_eq!(record.atoms().len(), 1);
    }

    #[test]
    fn unknown_extension_and_missing_file_fail() {
        let loader = FileLoader::new();
        assert!(matches!(
            loader.load(&StructureSource::File("a.xyz".into())),
            Err(LoadError::UnknownFormat(_))
        ));
        assert!(matches!(
            loader.load(&StructureSource::File("/nonexistent/a.pdb".into())),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn accession_resolves_in_directory_case_insensitively() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1YCR.pdb"), PDB_TEXT).unwrap();
        let loader = FileLoader::with_accession_dir(dir.path());

        let record = loader
            .load(&StructureSource::Accession("1ycr".into()))
            .unwrap();
        assert_eq!(record.id(), "1ycr");

        assert!(matches!(
            loader.load(&StructureSource::Accession("2d7t".into())),
            Err(LoadError::AccessionUnavailable(id)) if id == "2d7t"
        ));
        assert!(matches!(
            FileLoader::new().load(&StructureSource::Accession("1ycr".into())),
            Err(LoadError::AccessionUnavailable(_))
        ));
    }
}
