use crate::cli::AlignArgs;
use crate::commands::fetch::fetch_one;
use crate::config::PartialAlignConfig;
use crate::data::StructureCache;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use serde::Serialize;
use stackalign::{
    core::io::loader::StructureSource,
    core::io::mmcif::MmcifFile,
    core::io::pdb::PdbFile,
    core::io::traits::StructureFile,
    core::models::structure::{Dialect, StructureRecord},
    core::selection::{ChainError, chain_filter},
    core::stack::StructureStack,
    engine::progress::ProgressReporter,
    engine::usalign::UsAlign,
    workflows::{self, align::StackAlignment},
};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct ScoreRow<'a> {
    key: &'a str,
    score: f64,
    rmsd: Option<f64>,
    aligned_length: Option<usize>,
    is_target: bool,
}

pub async fn run(args: AlignArgs) -> Result<()> {
    let partial_config = PartialAlignConfig::load(&args)?;
    info!("Merging configuration from file and CLI arguments...");
    let resolved = partial_config.merge_with_cli(&args)?;

    let cache = StructureCache::new(args.cache_dir.clone())?;
    let stack = build_stack(&args, &cache).await?;
    info!("Loaded {} structure(s) into the stack.", stack.len());

    let working = if args.filter_chains {
        let narrowed = narrow_to_chains(&stack, &resolved.options.mobile_chains)?;
        for key in stack.keys().filter(|k| !narrowed.contains_key(k)) {
            warn!("Dropping '{}': requested chain not present.", key);
        }
        narrowed
    } else {
        stack.clone()
    };

    let engine = UsAlign::new(resolved.engine)?;
    info!("Using alignment engine at {:?}", engine.program());

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    eprintln!("Aligning {} structure(s)...", working.len());
    let alignment = tokio::task::block_in_place(|| {
        workflows::align::run(&working, &engine, &resolved.options, &reporter)
    })?;

    if let Some(dir) = &args.output_dir {
        let full: StructureStack = stack
            .into_iter()
            .filter(|(key, _)| working.contains_key(key))
            .collect();
        let moved = alignment.apply_to(&full)?;
        write_structures(&moved, dir)?;
        eprintln!(
            "✓ Superposed structures written to: {}",
            dir.display()
        );
    }

    match &args.scores {
        Some(path) => {
            write_scores(&alignment, std::fs::File::create(path)?)?;
            eprintln!("✓ Scores written to: {}", path.display());
        }
        None => write_scores(&alignment, std::io::stdout().lock())?,
    }

    Ok(())
}

async fn build_stack(args: &AlignArgs, cache: &StructureCache) -> Result<StructureStack> {
    if args.keys.len() > args.sources.len() {
        return Err(CliError::Argument(format!(
            "Got {} --key-as value(s) for {} source(s).",
            args.keys.len(),
            args.sources.len()
        )));
    }

    let sources: Vec<StructureSource> = args
        .sources
        .iter()
        .map(|s| StructureSource::parse(s))
        .collect();

    for source in &sources {
        if let StructureSource::Accession(id) = source {
            if cache.cached_path(id).is_none() {
                fetch_one(cache, id, false).await?;
            }
        }
    }

    let loader = cache.loader();
    let mut stack = StructureStack::new();
    for (i, source) in sources.iter().enumerate() {
        stack.add(&loader, source, args.keys.get(i).map(String::as_str))?;
    }
    Ok(stack)
}

/// Restricts each entry with a requested chain to it, dropping entries that lack it.
fn narrow_to_chains(
    stack: &StructureStack,
    chains: &HashMap<String, String>,
) -> Result<StructureStack> {
    let filter = |key: &str, record: &StructureRecord| -> std::result::Result<_, ChainError> {
        match chains.get(key) {
            Some(chain) => chain_filter(chain.as_str())(key, record),
            None => Ok(Some(record.clone())),
        }
    };
    Ok(stack.apply_filter(filter, false)?)
}

fn output_path(dir: &Path, key: &str, dialect: Dialect) -> PathBuf {
    dir.join(format!("{}_aligned.{}", key, dialect.extension()))
}

fn write_structures(stack: &StructureStack, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (key, record) in stack.iter() {
        let path = output_path(dir, key, record.dialect());
        info!("Writing '{}' to {:?}", key, &path);
        let written = match record.dialect() {
            Dialect::Pdb => PdbFile::write_to_path(record, &path).map_err(|e| e.to_string()),
            Dialect::Mmcif => MmcifFile::write_to_path(record, &path).map_err(|e| e.to_string()),
        };
        written.map_err(|message| CliError::Output {
            key: key.to_string(),
            message,
        })?;
    }
    Ok(())
}

fn write_scores<W: Write>(alignment: &StackAlignment, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (key, score) in alignment.ranked_scores() {
        let report = alignment.reports.get(key);
        csv_writer.serialize(ScoreRow {
            key,
            score,
            rmsd: report.and_then(|r| r.rmsd),
            aligned_length: report.and_then(|r| r.aligned_length),
            is_target: key == alignment.target,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};
    use stackalign::core::geometry::Transform;
    use stackalign::core::keyed::KeyedMap;
    use stackalign::core::models::atom::{AtomRecord, ChainLabels};
    use stackalign::engine::report::Superposition;
    use tempfile::tempdir;

    fn record(id: &str, dialect: Dialect, chains: &[&str]) -> StructureRecord {
        let mut record = StructureRecord::new(id, dialect);
        for (i, chain) in chains.iter().enumerate() {
            record.atoms_mut().push(AtomRecord::new(
                i + 1,
                "CA",
                "ALA",
                i as isize + 1,
                ChainLabels::legacy(chain),
                Point3::new(i as f64, 0.0, 0.0),
            ));
        }
        record
    }

    fn alignment() -> StackAlignment {
        let report = Superposition {
            transform: Transform::new(nalgebra::Matrix3::identity(), Vector3::new(1.0, 0.0, 0.0)),
            score: 0.27812,
            rmsd: Some(2.5),
            aligned_length: Some(80),
        };
        let mut scores = KeyedMap::new();
        scores.insert("1ycr", 1.0);
        scores.insert("2d7t", 0.27812);
        let mut reports = KeyedMap::new();
        reports.insert("2d7t", report);
        StackAlignment {
            target: "1ycr".into(),
            transforms: KeyedMap::new(),
            structures: StructureStack::new(),
            scores,
            reports,
        }
    }

    #[test]
    fn score_table_has_header_and_ranked_rows() {
        let mut out = Vec::new();
        write_scores(&alignment(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "key,score,rmsd,aligned_length,is_target");
        assert_eq!(lines[1], "1ycr,1.0,,,true");
        assert_eq!(lines[2], "2d7t,0.27812,2.5,80,false");
    }

    #[test]
    fn structures_are_written_in_their_dialect() {
        let dir = tempdir().unwrap();
        let stack: StructureStack = [
            ("1ycr".to_string(), record("1ycr", Dialect::Pdb, &["A"])),
            ("7xyz".to_string(), record("7xyz", Dialect::Mmcif, &["A"])),
        ]
        .into_iter()
        .collect();

        write_structures(&stack, dir.path()).unwrap();
        assert!(dir.path().join("1ycr_aligned.pdb").is_file());
        assert!(dir.path().join("7xyz_aligned.cif").is_file());
    }

    #[test]
    fn narrowing_drops_only_entries_missing_their_chain() {
        let stack: StructureStack = [
            ("a".to_string(), record("a", Dialect::Pdb, &["A", "B"])),
            ("b".to_string(), record("b", Dialect::Pdb, &["B"])),
            ("c".to_string(), record("c", Dialect::Pdb, &["C"])),
        ]
        .into_iter()
        .collect();
        let chains = HashMap::from([
            ("a".to_string(), "A".to_string()),
            ("b".to_string(), "A".to_string()),
        ]);

        let narrowed = narrow_to_chains(&stack, &chains).unwrap();
        assert_eq!(narrowed.keys().collect::<Vec<_>>(), ["a", "c"]);
        assert_eq!(narrowed.get("a").unwrap().atoms().len(), 1);
        assert_eq!(narrowed.get("c"), stack.get("c"));
    }
}
