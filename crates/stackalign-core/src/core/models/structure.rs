use super::atom::{AtomRecord, ChainColumn};
use crate::core::geometry::Transform;
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::fmt;

/// The record sections a structure's atoms are grouped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// Standard polymer atoms.
    Atom,
    /// Heteroatoms: ligands, ions, waters.
    Hetatm,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Atom, Section::Hetatm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Atom => "ATOM",
            Section::Hetatm => "HETATM",
        }
    }

    pub fn from_record_name(name: &str) -> Option<Self> {
        match name.trim() {
            "ATOM" => Some(Section::Atom),
            "HETATM" => Some(Section::Hetatm),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The file dialect a structure was read from, which also decides how it is
/// written back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// The legacy fixed-column format.
    #[default]
    Pdb,
    /// The modern columnar format.
    Mmcif,
}

impl Dialect {
    /// The chain columns a table of this dialect carries.
    pub fn chain_columns(&self) -> Vec<ChainColumn> {
        match self {
            Dialect::Pdb => vec![ChainColumn::ChainId],
            Dialect::Mmcif => vec![ChainColumn::AuthAsymId, ChainColumn::LabelAsymId],
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::Pdb => "pdb",
            Dialect::Mmcif => "cif",
        }
    }
}

/// The atom rows of one section together with the chain columns it carries.
///
/// Column presence belongs to the table, not to individual rows, so an empty
/// table still reports which chain conventions it uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomTable {
    chain_columns: Vec<ChainColumn>,
    rows: Vec<AtomRecord>,
}

impl AtomTable {
    pub fn new(chain_columns: Vec<ChainColumn>) -> Self {
        Self {
            chain_columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(chain_columns: Vec<ChainColumn>, rows: Vec<AtomRecord>) -> Self {
        Self {
            chain_columns,
            rows,
        }
    }

    pub fn chain_columns(&self) -> &[ChainColumn] {
        &self.chain_columns
    }

    pub fn has_column(&self, column: ChainColumn) -> bool {
        self.chain_columns.contains(&column)
    }

    pub fn rows(&self) -> &[AtomRecord] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [AtomRecord] {
        &mut self.rows
    }

    pub fn push(&mut self, row: AtomRecord) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keeps only the rows for which `predicate` holds.
    pub fn retain(&mut self, predicate: impl FnMut(&AtomRecord) -> bool) {
        self.rows.retain(predicate);
    }

    /// A new table with the same columns and only the matching rows.
    pub fn filtered(&self, mut predicate: impl FnMut(&AtomRecord) -> bool) -> Self {
        Self {
            chain_columns: self.chain_columns.clone(),
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    pub fn coordinates(&self) -> Vec<Point3<f64>> {
        self.rows.iter().map(|r| r.position).collect()
    }

    /// Replaces the coordinates row by row.
    ///
    /// # Panics
    ///
    /// Panics if `coords` does not have exactly one point per row.
    pub fn set_coordinates(&mut self, coords: &[Point3<f64>]) {
        assert_eq!(
            coords.len(),
            self.rows.len(),
            "coordinate count must match row count"
        );
        for (row, &p) in self.rows.iter_mut().zip(coords) {
            row.position = p;
        }
    }
}

/// One molecular structure: its identifier, native dialect, and atom sections.
///
/// A record always has an `ATOM` section, possibly empty. Cloning performs a
/// deep copy, which is what every narrowing operation relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureRecord {
    id: String,
    dialect: Dialect,
    sections: BTreeMap<Section, AtomTable>,
}

impl StructureRecord {
    /// Creates an empty structure with an empty `ATOM` section.
    pub fn new(id: impl Into<String>, dialect: Dialect) -> Self {
        let mut sections = BTreeMap::new();
        sections.insert(Section::Atom, AtomTable::new(dialect.chain_columns()));
        Self {
            id: id.into(),
            dialect,
            sections,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The `ATOM` section.
    pub fn atoms(&self) -> &AtomTable {
        &self.sections[&Section::Atom]
    }

    pub fn atoms_mut(&mut self) -> &mut AtomTable {
        self.section_or_default(Section::Atom)
    }

    pub fn section(&self, section: Section) -> Option<&AtomTable> {
        self.sections.get(&section)
    }

    pub fn section_mut(&mut self, section: Section) -> Option<&mut AtomTable> {
        self.sections.get_mut(&section)
    }

    /// The section's table, created empty with the dialect's columns if absent.
    pub fn section_or_default(&mut self, section: Section) -> &mut AtomTable {
        let columns = self.dialect.chain_columns();
        self.sections
            .entry(section)
            .or_insert_with(|| AtomTable::new(columns))
    }

    pub fn set_section(&mut self, section: Section, table: AtomTable) {
        self.sections.insert(section, table);
    }

    /// Removes a section; the `ATOM` section is emptied instead of removed.
    pub fn clear_section(&mut self, section: Section) {
        match section {
            Section::Atom => self.atoms_mut().retain(|_| false),
            Section::Hetatm => {
                self.sections.remove(&section);
            }
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = (Section, &AtomTable)> {
        self.sections.iter().map(|(s, t)| (*s, t))
    }

    /// Total number of atom rows across all sections.
    pub fn atom_count(&self) -> usize {
        self.sections.values().map(AtomTable::len).sum()
    }

    /// Distinct chain labels of the `ATOM` section, in order of first appearance.
    pub fn chain_ids(&self, column: ChainColumn) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for row in self.atoms().rows() {
            if let Some(label) = row.chain.get(column) {
                if !seen.iter().any(|s| s == label) {
                    seen.push(label.to_string());
                }
            }
        }
        seen
    }

    /// Applies a rigid-body transform to every section in place.
    pub fn apply_transform(&mut self, transform: &Transform) {
        for table in self.sections.values_mut() {
            let moved = transform.apply_coords(&table.coordinates());
            table.set_coordinates(&moved);
        }
    }

    /// A transformed copy; `self` is left untouched.
    pub fn transformed(&self, transform: &Transform) -> Self {
        let mut copy = self.clone();
        copy.apply_transform(transform);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::ChainLabels;
    use nalgebra::{Matrix3, Vector3};

    fn atom(serial: usize, name: &str, chain: &str, p: [f64; 3]) -> AtomRecord {
        AtomRecord::new(
            serial,
            name,
            "ALA",
            serial as isize,
            ChainLabels::legacy(chain),
            Point3::new(p[0], p[1], p[2]),
        )
    }

    fn two_chain_record() -> StructureRecord {
        let mut record = StructureRecord::new("test", Dialect::Pdb);
        record.atoms_mut().push(atom(1, "CA", "A", [1.0, 0.0, 0.0]));
        record.atoms_mut().push(atom(2, "CA", "B", [0.0, 1.0, 0.0]));
        record.atoms_mut().push(atom(3, "CB", "A", [0.0, 0.0, 1.0]));
        record
            .section_or_default(Section::Hetatm)
            .push(atom(4, "O", "A", [2.0, 2.0, 2.0]));
        record
    }

    #[test]
    fn new_record_has_empty_atom_section_with_dialect_columns() {
        let record = StructureRecord::new("x", Dialect::Mmcif);
        assert!(record.atoms().is_empty());
        assert!(record.atoms().has_column(ChainColumn::AuthAsymId));
        assert!(record.atoms().has_column(ChainColumn::LabelAsymId));
        assert!(!record.atoms().has_column(ChainColumn::ChainId));
        assert!(record.section(Section::Hetatm).is_none());
    }

    #[test]
    fn chain_ids_are_listed_in_order_of_appearance() {
        let record = two_chain_record();
        assert_eq!(record.chain_ids(ChainColumn::ChainId), vec!["A", "B"]);
        assert!(record.chain_ids(ChainColumn::AuthAsymId).is_empty());
        assert_eq!(record.atom_count(), 4);
    }

    #[test]
    fn clearing_atom_section_keeps_it_present() {
        let mut record = two_chain_record();
        record.clear_section(Section::Atom);
        record.clear_section(Section::Hetatm);
        assert!(record.atoms().is_empty());
        assert!(record.section(Section::Hetatm).is_none());
    }

    #[test]
    fn transform_moves_every_section() {
        let record = two_chain_record();
        let shift = Transform::new(Matrix3::identity(), Vector3::new(1.0, -1.0, 0.5));
        let moved = record.transformed(&shift);

        assert_eq!(moved.atoms().rows()[0].position, Point3::new(2.0, -1.0, 0.5));
        assert_eq!(
            moved.section(Section::Hetatm).unwrap().rows()[0].position,
            Point3::new(3.0, 1.0, 2.5)
        );
        assert_eq!(record.atoms().rows()[0].position, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn filtered_table_keeps_columns() {
        let record = two_chain_record();
        let only_b = record
            .atoms()
            .filtered(|r| r.chain.get(ChainColumn::ChainId) == Some("B"));
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b.chain_columns(), &[ChainColumn::ChainId]);
    }

    #[test]
    fn section_names_parse_from_record_names() {
        assert_eq!(Section::from_record_name("ATOM  "), Some(Section::Atom));
        assert_eq!(Section::from_record_name("HETATM"), Some(Section::Hetatm));
        assert_eq!(Section::from_record_name("ANISOU"), None);
    }
}
