use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;

/// Identifies one of the column conventions used to label chains.
///
/// Legacy fixed-column files carry a single `chain_id` column, while modern
/// columnar files carry both an author-assigned (`auth_asym_id`) and a
/// sequential label (`label_asym_id`) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainColumn {
    /// The primary chain identifier of the legacy format.
    ChainId,
    /// The author-assigned chain identifier.
    AuthAsymId,
    /// The label chain identifier assigned by the archive.
    LabelAsymId,
}

impl ChainColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainColumn::ChainId => "chain_id",
            ChainColumn::AuthAsymId => "auth_asym_id",
            ChainColumn::LabelAsymId => "label_asym_id",
        }
    }
}

impl fmt::Display for ChainColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainColumn {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chain_id" => Ok(ChainColumn::ChainId),
            "auth_asym_id" => Ok(ChainColumn::AuthAsymId),
            "label_asym_id" => Ok(ChainColumn::LabelAsymId),
            _ => Err(()),
        }
    }
}

/// The chain identifiers of an atom, one slot per [`ChainColumn`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainLabels {
    pub chain_id: Option<String>,
    pub auth_asym_id: Option<String>,
    pub label_asym_id: Option<String>,
}

impl ChainLabels {
    /// Labels for a legacy record, which only knows `chain_id`.
    pub fn legacy(chain: &str) -> Self {
        Self {
            chain_id: Some(chain.to_string()),
            ..Default::default()
        }
    }

    pub fn get(&self, column: ChainColumn) -> Option<&str> {
        match column {
            ChainColumn::ChainId => self.chain_id.as_deref(),
            ChainColumn::AuthAsymId => self.auth_asym_id.as_deref(),
            ChainColumn::LabelAsymId => self.label_asym_id.as_deref(),
        }
    }

    pub fn set(&mut self, column: ChainColumn, value: Option<String>) {
        match column {
            ChainColumn::ChainId => self.chain_id = value,
            ChainColumn::AuthAsymId => self.auth_asym_id = value,
            ChainColumn::LabelAsymId => self.label_asym_id = value,
        }
    }

    /// The first label present, following the given column priority.
    pub fn first_of(&self, columns: &[ChainColumn]) -> Option<&str> {
        columns.iter().find_map(|&c| self.get(c))
    }
}

/// One atom row of a structure table.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    /// The atom serial number.
    pub serial: usize,
    /// The atom name (e.g., "CA", "N", "O").
    pub name: String,
    /// Alternate location indicator, empty when absent.
    pub alt_loc: String,
    /// Three-letter residue name (e.g., "ALA").
    pub residue_name: String,
    /// Chain identifiers under each column convention.
    pub chain: ChainLabels,
    /// Residue sequence number.
    pub residue_number: isize,
    /// Residue insertion code, empty when absent.
    pub insertion_code: String,
    /// Element symbol, empty when unknown.
    pub element: String,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    pub occupancy: Option<f64>,
    pub b_factor: Option<f64>,
    /// Formal charge in elementary charge units.
    pub charge: Option<f64>,
}

impl AtomRecord {
    /// Creates a record with the required fields set and the optional ones empty.
    pub fn new(
        serial: usize,
        name: &str,
        residue_name: &str,
        residue_number: isize,
        chain: ChainLabels,
        position: Point3<f64>,
    ) -> Self {
        Self {
            serial,
            name: name.to_string(),
            alt_loc: String::new(),
            residue_name: residue_name.to_string(),
            chain,
            residue_number,
            insertion_code: String::new(),
            element: String::new(),
            position,
            occupancy: None,
            b_factor: None,
            charge: None,
        }
    }

    pub fn is_alpha_carbon(&self) -> bool {
        self.name == "CA"
    }
}
