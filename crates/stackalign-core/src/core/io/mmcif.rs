use crate::core::io::traits::StructureFile;
use crate::core::models::atom::{AtomRecord, ChainColumn, ChainLabels};
use crate::core::models::structure::{AtomTable, Dialect, Section, StructureRecord};
use crate::core::selection::CHAIN_COLUMN_PRIORITY;
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::warn;

const ATOM_SITE_PREFIX: &str = "_atom_site.";

const WRITTEN_COLUMNS: [&str; 18] = [
    "group_PDB",
    "id",
    "type_symbol",
    "label_atom_id",
    "label_alt_id",
    "label_comp_id",
    "label_asym_id",
    "label_seq_id",
    "pdbx_PDB_ins_code",
    "Cartn_x",
    "Cartn_y",
    "Cartn_z",
    "occupancy",
    "B_iso_or_equiv",
    "pdbx_formal_charge",
    "auth_seq_id",
    "auth_asym_id",
    "pdbx_PDB_model_num",
];

#[derive(Debug, Error)]
pub enum MmcifError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing required _atom_site column: {0}")]
    MissingColumn(&'static str),
    #[error("Invalid value '{value}' for _atom_site.{column} in row {row}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

/// Splits a data line into tokens, honouring single and double quotes.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        if chars[i] == '\'' || chars[i] == '"' {
            let quote = chars[i];
            let start = i + 1;
            let mut end = start;
            // A quote only closes a value when followed by whitespace or end of line.
            while end < chars.len()
                && !(chars[end] == quote && chars.get(end + 1).is_none_or(|c| c.is_whitespace()))
            {
                end += 1;
            }
            tokens.push(chars[start..end.min(chars.len())].iter().collect());
            i = end + 1;
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }
    tokens
}

fn is_null(value: &str) -> bool {
    value == "." || value == "?"
}

fn quote(value: &str) -> String {
    if value.is_empty() {
        return ".".to_string();
    }
    let needs_quotes = value.contains(char::is_whitespace)
        || value.starts_with(['_', '#', '\'', '"', '$', '[', ';'])
        || value == "."
        || value == "?";
    if !needs_quotes {
        value.to_string()
    } else if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    fn require(&self, name: &'static str) -> Result<usize, MmcifError> {
        self.get(name).ok_or(MmcifError::MissingColumn(name))
    }
}

struct RowReader<'a> {
    row: &'a [String],
    index: usize,
}

impl<'a> RowReader<'a> {
    fn text(&self, column: Option<usize>) -> Option<&'a str> {
        column
            .and_then(|c| self.row.get(c))
            .map(String::as_str)
            .filter(|v| !is_null(v))
    }

    fn float(&self, column: usize, name: &'static str) -> Result<f64, MmcifError> {
        let value = self.row.get(column).map(String::as_str).unwrap_or("");
        value.parse().map_err(|_| MmcifError::InvalidValue {
            row: self.index,
            column: name,
            value: value.to_string(),
        })
    }
}

/// The modern columnar structure format (the `_atom_site` loop only).
pub struct MmcifFile;

impl MmcifFile {
    fn parse_atom_site(
        id: &str,
        columns: &[String],
        rows: &[Vec<String>],
    ) -> Result<StructureRecord, MmcifError> {
        let index = ColumnIndex {
            positions: columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), i))
                .collect(),
        };

        let x_col = index.require("Cartn_x")?;
        let y_col = index.require("Cartn_y")?;
        let z_col = index.require("Cartn_z")?;
        let name_col = index
            .get("label_atom_id")
            .or_else(|| index.get("auth_atom_id"))
            .ok_or(MmcifError::MissingColumn("label_atom_id"))?;
        let comp_col = index
            .get("label_comp_id")
            .or_else(|| index.get("auth_comp_id"))
            .ok_or(MmcifError::MissingColumn("label_comp_id"))?;
        let auth_chain_col = index.get("auth_asym_id");
        let label_chain_col = index.get("label_asym_id");
        let seq_cols = [index.get("auth_seq_id"), index.get("label_seq_id")];
        let model_col = index.get("pdbx_PDB_model_num");

        let chain_columns: Vec<ChainColumn> = [
            (ChainColumn::AuthAsymId, auth_chain_col),
            (ChainColumn::LabelAsymId, label_chain_col),
        ]
        .into_iter()
        .filter_map(|(column, position)| position.map(|_| column))
        .collect();

        let mut record = StructureRecord::new(id, Dialect::Mmcif);
        record.set_section(Section::Atom, AtomTable::new(chain_columns.clone()));

        let mut first_model: Option<String> = None;
        for (i, row) in rows.iter().enumerate() {
            let reader = RowReader { row, index: i + 1 };

            if let Some(model) = reader.text(model_col) {
                match &first_model {
                    None => first_model = Some(model.to_string()),
                    Some(first) if first != model => continue,
                    _ => {}
                }
            }

            let section = match reader.text(index.get("group_PDB")) {
                Some(group) => match Section::from_record_name(group) {
                    Some(section) => section,
                    None => {
                        warn!(row = i + 1, group, "Skipping _atom_site row with unknown group.");
                        continue;
                    }
                },
                None => Section::Atom,
            };

            let position = Point3::new(
                reader.float(x_col, "Cartn_x")?,
                reader.float(y_col, "Cartn_y")?,
                reader.float(z_col, "Cartn_z")?,
            );
            let residue_number = seq_cols
                .iter()
                .filter_map(|&c| reader.text(c))
                .find_map(|v| v.parse::<isize>().ok())
                .unwrap_or(0);
            let serial = reader
                .text(index.get("id"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(i + 1);
            let chain = ChainLabels {
                chain_id: None,
                auth_asym_id: reader.text(auth_chain_col).map(str::to_string),
                label_asym_id: reader.text(label_chain_col).map(str::to_string),
            };

            let mut atom = AtomRecord::new(
                serial,
                reader.text(Some(name_col)).unwrap_or(""),
                reader.text(Some(comp_col)).unwrap_or(""),
                residue_number,
                chain,
                position,
            );
            atom.alt_loc = reader
                .text(index.get("label_alt_id"))
                .unwrap_or("")
                .to_string();
            atom.insertion_code = reader
                .text(index.get("pdbx_PDB_ins_code"))
                .unwrap_or("")
                .to_string();
            atom.element = reader
                .text(index.get("type_symbol"))
                .unwrap_or("")
                .to_string();
            atom.occupancy = reader
                .text(index.get("occupancy"))
                .and_then(|v| v.parse().ok());
            atom.b_factor = reader
                .text(index.get("B_iso_or_equiv"))
                .and_then(|v| v.parse().ok());
            atom.charge = reader
                .text(index.get("pdbx_formal_charge"))
                .and_then(|v| v.parse().ok());

            if section == Section::Hetatm && record.section(Section::Hetatm).is_none() {
                record.set_section(Section::Hetatm, AtomTable::new(chain_columns.clone()));
            }
            record.section_or_default(section).push(atom);
        }

        Ok(record)
    }
}

impl StructureFile for MmcifFile {
    type Error = MmcifError;

    fn read_from(id: &str, reader: &mut impl BufRead) -> Result<StructureRecord, Self::Error> {
        #[derive(PartialEq)]
        enum State {
            Scanning,
            LoopStart,
            Header,
            Rows,
        }

        let mut state = State::Scanning;
        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for line_res in reader.lines() {
            let line = line_res?;
            let trimmed = line.trim();

            if state == State::Rows {
                if trimmed.starts_with('#')
                    || trimmed.starts_with('_')
                    || trimmed.starts_with("loop_")
                    || trimmed.starts_with("data_")
                {
                    break;
                }
                pending.extend(tokenize(trimmed));
                while pending.len() >= columns.len() {
                    rows.push(pending.drain(..columns.len()).collect());
                }
                continue;
            }

            if trimmed == "loop_" {
                state = State::LoopStart;
                columns.clear();
                continue;
            }
            match state {
                State::LoopStart | State::Header => {
                    if let Some(name) = trimmed.strip_prefix(ATOM_SITE_PREFIX) {
                        columns.push(name.trim().to_string());
                        state = State::Header;
                    } else if state == State::Header && !trimmed.is_empty() {
                        state = State::Rows;
                        pending.extend(tokenize(trimmed));
                        while pending.len() >= columns.len() {
                            rows.push(pending.drain(..columns.len()).collect());
                        }
                    } else if trimmed.starts_with('_') {
                        state = State::Scanning;
                    }
                }
                State::Scanning | State::Rows => {}
            }
        }

        if !pending.is_empty() {
            warn!(
                leftover = pending.len(),
                "Ignoring incomplete trailing _atom_site row."
            );
        }
        if rows.is_empty() {
            return Err(MmcifError::MissingRecord("_atom_site loop".into()));
        }
        Self::parse_atom_site(id, &columns, &rows)
    }

    fn write_to(record: &StructureRecord, writer: &mut impl Write) -> Result<(), Self::Error> {
        let data_name = if record.id().is_empty() {
            "structure"
        } else {
            record.id()
        };
        writeln!(writer, "data_{}", quote(data_name).replace(' ', "_"))?;
        writeln!(writer, "#")?;
        writeln!(writer, "loop_")?;
        for column in WRITTEN_COLUMNS {
            writeln!(writer, "{}{}", ATOM_SITE_PREFIX, column)?;
        }

        for (section, table) in record.sections() {
            for atom in table.rows() {
                let fallback = atom.chain.first_of(&CHAIN_COLUMN_PRIORITY).unwrap_or("");
                let label_chain = atom.chain.label_asym_id.as_deref().unwrap_or(fallback);
                let auth_chain = atom.chain.auth_asym_id.as_deref().unwrap_or(fallback);
                let label_seq = match section {
                    Section::Atom => atom.residue_number.to_string(),
                    Section::Hetatm => ".".to_string(),
                };
                let fields = [
                    section.as_str().to_string(),
                    atom.serial.to_string(),
                    quote(&atom.element),
                    quote(&atom.name),
                    quote(&atom.alt_loc),
                    quote(&atom.residue_name),
                    quote(label_chain),
                    label_seq,
                    quote(&atom.insertion_code),
                    format!("{:.3}", atom.position.x),
                    format!("{:.3}", atom.position.y),
                    format!("{:.3}", atom.position.z),
                    atom.occupancy.map_or_else(|| "?".into(), |v| format!("{:.2}", v)),
                    atom.b_factor.map_or_else(|| "?".into(), |v| format!("{:.2}", v)),
                    atom.charge
                        .map_or_else(|| "?".into(), |v| format!("{}", v.round() as i64)),
                    atom.residue_number.to_string(),
                    quote(auth_chain),
                    "1".to_string(),
                ];
                writeln!(writer, "{}", fields.join(" "))?;
            }
        }
        writeln!(writer, "#")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
data_2TST
#
_entry.id 2TST
#
loop_
_atom_site.group_PDB
_atom_site.id
_atom_site.type_symbol
_atom_site.label_atom_id
_atom_site.label_alt_id
_atom_site.label_comp_id
_atom_site.label_asym_id
_atom_site.label_seq_id
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
_atom_site.occupancy
_atom_site.B_iso_or_equiv
_atom_site.auth_seq_id
_atom_site.auth_asym_id
_atom_site.pdbx_PDB_model_num
ATOM   1 N N   . MET A 1 27.340 24.430 2.614 1.00 9.67 1 H 1
ATOM   2 C CA  . MET A 1 26.266 25.413 2.842 1.00 10.38 1 H 1
ATOM   3 O \"O5'\" . DT B 2 -1.500 0.000 100.125 0.50 20.00 5 L 1
HETATM 4 O O   . HOH C . 5.000 5.000 5.000 1.00 30.00 201 H 1
ATOM   5 N N   . MET A 1 0.000 0.000 0.000 1.00 9.67 1 H 2
#
";

    fn read_sample() -> StructureRecord {
        MmcifFile::read_from("2tst", &mut Cursor::new(SAMPLE)).unwrap()
    }

    #[test]
    fn tokenizer_honours_quotes() {
        assert_eq!(
            tokenize("ATOM 3 \"O5'\" 'a b' x"),
            vec!["ATOM", "3", "O5'", "a b", "x"]
        );
    }

    #[test]
    fn reads_atom_site_loop_into_sections() {
        let record = read_sample();
        assert_eq!(record.dialect(), Dialect::Mmcif);
        assert_eq!(record.atoms().len(), 3);
        assert_eq!(record.section(Section::Hetatm).unwrap().len(), 1);
        assert_eq!(
            record.atoms().chain_columns(),
            &[ChainColumn::AuthAsymId, ChainColumn::LabelAsymId]
        );
    }

    #[test]
    fn parses_row_values() {
        let record = read_sample();
        let atom = &record.atoms().rows()[2];
        assert_eq!(atom.name, "O5'");
        assert_eq!(atom.residue_name, "DT");
        assert_eq!(atom.residue_number, 5);
        assert_eq!(atom.chain.auth_asym_id.as_deref(), Some("L"));
        assert_eq!(atom.chain.label_asym_id.as_deref(), Some("B"));
        assert_eq!(atom.chain.chain_id, None);
        assert_eq!(atom.position, Point3::new(-1.5, 0.0, 100.125));
        assert_eq!(atom.occupancy, Some(0.5));
        assert!(atom.alt_loc.is_empty());

        let water = &record.section(Section::Hetatm).unwrap().rows()[0];
        assert_eq!(water.residue_number, 201);
    }

    #[test]
    fn keeps_only_first_model() {
        let record = read_sample();
        assert!(record.atoms().rows().iter().all(|a| a.serial != 5));
    }

    #[test]
    fn missing_coordinates_column_is_an_error() {
        let text = "data_x\nloop_\n_atom_site.id\n_atom_site.label_atom_id\n1 CA\n#\n";
        assert!(matches!(
            MmcifFile::read_from("x", &mut Cursor::new(text)),
            Err(MmcifError::MissingColumn("Cartn_x"))
        ));
    }

    #[test]
    fn file_without_atom_site_is_an_error() {
        let text = "data_x\nloop_\n_entity.id\n1\n#\n";
        assert!(matches!(
            MmcifFile::read_from("x", &mut Cursor::new(text)),
            Err(MmcifError::MissingRecord(_))
        ));
    }

    #[test]
    fn written_text_reads_back_with_same_atoms() {
        let record = read_sample();
        let mut out = Vec::new();
        MmcifFile::write_to(&record, &mut out).unwrap();
        let reread = MmcifFile::read_from("2tst", &mut Cursor::new(out)).unwrap();

        assert_eq!(reread.atoms().len(), record.atoms().len());
        for (a, b) in reread.atoms().rows().iter().zip(record.atoms().rows()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.chain, b.chain);
            assert_eq!(a.position, b.position);
            assert_eq!(a.residue_number, b.residue_number);
        }
        assert_eq!(reread.section(Section::Hetatm).unwrap().len(), 1);
    }
}
