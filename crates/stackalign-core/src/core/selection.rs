use crate::core::models::atom::ChainColumn;
use crate::core::models::structure::{AtomTable, StructureRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Candidate chain columns, checked in this order.
pub const CHAIN_COLUMN_PRIORITY: [ChainColumn; 3] = [
    ChainColumn::ChainId,
    ChainColumn::AuthAsymId,
    ChainColumn::LabelAsymId,
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("No recognized chain identifier column in the ATOM section of '{structure}'")]
    NoChainColumn { structure: String },

    #[error("No such chain '{chain}' found in structure '{structure}'")]
    ChainNotFound { structure: String, chain: String },
}

/// Returns the first column of [`CHAIN_COLUMN_PRIORITY`] the table carries.
pub fn resolve_chain_column(table: &AtomTable) -> Option<ChainColumn> {
    CHAIN_COLUMN_PRIORITY
        .into_iter()
        .find(|&column| table.has_column(column))
}

/// Returns a copy of `record` whose `ATOM` section holds only the rows of `chain`.
///
/// Other sections are copied unchanged and `record` itself is never modified.
///
/// # Errors
///
/// Returns [`ChainError::NoChainColumn`] if the `ATOM` section carries none of
/// the candidate columns, and [`ChainError::ChainNotFound`] if no row matches.
pub fn select_chain(record: &StructureRecord, chain: &str) -> Result<StructureRecord, ChainError> {
    let column = resolve_chain_column(record.atoms()).ok_or_else(|| ChainError::NoChainColumn {
        structure: record.id().to_string(),
    })?;

    let atoms = record
        .atoms()
        .filtered(|row| row.chain.get(column) == Some(chain));
    if atoms.is_empty() {
        return Err(ChainError::ChainNotFound {
            structure: record.id().to_string(),
            chain: chain.to_string(),
        });
    }

    let mut filtered = record.clone();
    *filtered.atoms_mut() = atoms;
    Ok(filtered)
}

/// A stack filter restricting every entry to `chain`.
///
/// Entries without the chain are reported as null; a structure with no chain
/// column at all is an error.
pub fn chain_filter(
    chain: impl Into<String>,
) -> impl Fn(&str, &StructureRecord) -> Result<Option<StructureRecord>, ChainError> + Send + Sync {
    let chain = chain.into();
    move |_key, record| null_if_missing(select_chain(record, &chain))
}

/// A stack filter restricting each entry to the chain mapped to its key.
///
/// Keys absent from `chains` are reported as null.
pub fn chain_map_filter(
    chains: HashMap<String, String>,
) -> impl Fn(&str, &StructureRecord) -> Result<Option<StructureRecord>, ChainError> + Send + Sync {
    move |key, record| match chains.get(key) {
        Some(chain) => null_if_missing(select_chain(record, chain)),
        None => Ok(None),
    }
}

fn null_if_missing(
    result: Result<StructureRecord, ChainError>,
) -> Result<Option<StructureRecord>, ChainError> {
    match result {
        Ok(record) => Ok(Some(record)),
        Err(ChainError::ChainNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
