use crate::core::io::traits::StructureFile;
use crate::core::models::atom::{AtomRecord, ChainLabels};
use crate::core::models::structure::{Dialect, Section, StructureRecord};
use crate::core::selection::CHAIN_COLUMN_PRIORITY;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const MIN_COORDINATE_LINE_LENGTH: usize = 54;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_int<T: std::str::FromStr>(line: &str, start: usize, end: usize, line_num: usize) -> Result<T, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_float(line: &str, start: usize, end: usize, line_num: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_optional_float(line: &str, start: usize, end: usize) -> Option<f64> {
    slice_and_trim(line, start, end).parse().ok()
}

/// Parses the two-column charge field ("2+", "1-"); blank means absent.
fn parse_charge(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    let (magnitude, sign) = match field.chars().last() {
        Some('+') => (&field[..field.len() - 1], 1.0),
        Some('-') => (&field[..field.len() - 1], -1.0),
        _ => (field, 1.0),
    };
    magnitude.trim().parse::<f64>().ok().map(|m| m * sign)
}

fn format_charge(charge: Option<f64>) -> String {
    match charge {
        Some(c) if c != 0.0 => {
            let sign = if c < 0.0 { '-' } else { '+' };
            format!("{}{}", c.abs().round() as u32, sign)
        }
        _ => String::new(),
    }
}

fn format_atom_name(name: &str) -> String {
    if name.len() < 4 {
        format!(" {:<3}", name)
    } else {
        format!("{:<4}", name)
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| " ".repeat(6), |v| format!("{:>6.2}", v))
}

/// The legacy fixed-column structure format.
///
/// Only the first model is read; `ATOM` and `HETATM` records populate the
/// matching sections and every other record is skipped.
pub struct PdbFile;

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_from(id: &str, reader: &mut impl BufRead) -> Result<StructureRecord, Self::Error> {
        let mut record = StructureRecord::new(id, Dialect::Pdb);
        let mut seen_atoms = false;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_name = slice_and_trim(&line, 0, 6);

            match record_name {
                "ENDMDL" | "END" => break,
                "ATOM" | "HETATM" => {}
                _ => continue,
            }
            let Some(section) = Section::from_record_name(record_name) else {
                continue;
            };
            if line.len() < MIN_COORDINATE_LINE_LENGTH {
                return Err(PdbError::Parse {
                    line: line_num,
                    kind: PdbParseErrorKind::LineTooShort,
                });
            }

            let serial: usize = parse_int(&line, 6, 11, line_num)?;
            let residue_number: isize = parse_int(&line, 22, 26, line_num)?;
            let x = parse_float(&line, 30, 38, line_num)?;
            let y = parse_float(&line, 38, 46, line_num)?;
            let z = parse_float(&line, 46, 54, line_num)?;

            let mut atom = AtomRecord::new(
                serial,
                slice_and_trim(&line, 12, 16),
                slice_and_trim(&line, 17, 20),
                residue_number,
                ChainLabels::legacy(slice_and_trim(&line, 21, 22)),
                Point3::new(x, y, z),
            );
            atom.alt_loc = slice_and_trim(&line, 16, 17).to_string();
            atom.insertion_code = slice_and_trim(&line, 26, 27).to_string();
            atom.occupancy = parse_optional_float(&line, 54, 60);
            atom.b_factor = parse_optional_float(&line, 60, 66);
            atom.element = slice_and_trim(&line, 76, 78).to_string();
            atom.charge = parse_charge(slice_and_trim(&line, 78, 80));

            record.section_or_default(section).push(atom);
            seen_atoms = true;
        }

        if !seen_atoms {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }
        Ok(record)
    }

    fn write_to(record: &StructureRecord, writer: &mut impl Write) -> Result<(), Self::Error> {
        for (section, table) in record.sections() {
            for atom in table.rows() {
                let chain = atom
                    .chain
                    .first_of(&CHAIN_COLUMN_PRIORITY)
                    .and_then(|c| c.chars().next())
                    .unwrap_or(' ');
                writeln!(
                    writer,
                    "{:<6}{:>5} {}{:1}{:>3} {}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{}{}          {:>2}{:<2}",
                    section.as_str(),
                    atom.serial,
                    format_atom_name(&atom.name),
                    atom.alt_loc,
                    atom.residue_name,
                    chain,
                    atom.residue_number,
                    atom.insertion_code,
                    atom.position.x,
                    atom.position.y,
                    atom.position.z,
                    format_optional(atom.occupancy),
                    format_optional(atom.b_factor),
                    atom.element,
                    format_charge(atom.charge),
                )?;
            }
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}
