use clap::{Args, Parser, Subcommand, ValueEnum};
use stackalign::engine::config::ScoreNormalization;
use stackalign::workflows::align::TargetPolicy;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan",
    version,
    about = "StackAlign CLI - Superpose a stack of molecular structures onto a common reference with US-align.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel alignment.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Superpose every structure onto a target and report similarity scores.
    Align(AlignArgs),
    /// Download structures by PDB code or UniProt accession into the local cache.
    Fetch(FetchArgs),
    /// Inspect the local structure cache.
    Cache(CacheArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPolicyArg {
    /// Smallest key in lexicographic order.
    Lexicographic,
    First,
    Largest,
}

impl From<TargetPolicyArg> for TargetPolicy {
    fn from(arg: TargetPolicyArg) -> Self {
        match arg {
            TargetPolicyArg::Lexicographic => TargetPolicy::Lexicographic,
            TargetPolicyArg::First => TargetPolicy::First,
            TargetPolicyArg::Largest => TargetPolicy::Largest,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationArg {
    Mobile,
    Target,
}

impl From<NormalizationArg> for ScoreNormalization {
    fn from(arg: NormalizationArg) -> Self {
        match arg {
            NormalizationArg::Mobile => ScoreNormalization::Mobile,
            NormalizationArg::Target => ScoreNormalization::Target,
        }
    }
}

/// Arguments for the `align` subcommand.
#[derive(Args, Debug)]
pub struct AlignArgs {
    // --- Inputs ---
    /// Structure files (.pdb, .ent, .cif, .mmcif), PDB codes or UniProt accessions.
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Stack key for the source at the same position (defaults to the file stem or accession).
    #[arg(long = "key-as", value_name = "NAME")]
    pub keys: Vec<String>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Alignment Overrides ---
    /// Key of the reference structure every entry is superposed onto.
    #[arg(short, long, value_name = "KEY")]
    pub target: Option<String>,

    /// How to pick the reference when no target is named.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub target_policy: Option<TargetPolicyArg>,

    /// Restrict an entry to one chain while aligning. Can be used multiple times.
    /// Example: --chain 1ycr=A
    #[arg(long = "chain", value_name = "KEY=CHAIN")]
    pub chains: Vec<String>,

    /// Drop entries lacking their requested chain before aligning, instead of failing.
    #[arg(long)]
    pub filter_chains: bool,

    // --- Engine Overrides ---
    /// Path to the US-align (or TM-align) executable.
    #[arg(long, value_name = "PATH")]
    pub engine: Option<PathBuf>,

    /// Per-alignment timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Which structure's length the reported score is normalized by.
    #[arg(long, value_enum, value_name = "STRUCTURE")]
    pub normalize_by: Option<NormalizationArg>,

    // --- Outputs ---
    /// Directory to write the superposed structures to.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write the score table as CSV to this path instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub scores: Option<PathBuf>,

    /// Override the structure cache directory.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the `fetch` subcommand.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// PDB codes or UniProt accessions to download.
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,

    /// Re-download structures that are already cached.
    #[arg(long)]
    pub force: bool,

    /// Override the structure cache directory.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the `cache` subcommand.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,

    /// Override the structure cache directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show the absolute path to the structure cache directory.
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_align_with_repeated_chains() {
        let cli = Cli::parse_from([
            "stackalign",
            "-vv",
            "align",
            "a.pdb",
            "1ycr",
            "--chain",
            "a=A",
            "--chain",
            "1ycr=B",
            "--target-policy",
            "largest",
            "--normalize-by",
            "target",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Align(args) = cli.command else {
            panic!("Expected 'align' subcommand");
        };
        assert_eq!(args.sources, ["a.pdb", "1ycr"]);
        assert_eq!(args.chains, ["a=A", "1ycr=B"]);
        assert_eq!(args.target_policy, Some(TargetPolicyArg::Largest));
        assert_eq!(args.normalize_by, Some(NormalizationArg::Target));
        assert!(!args.filter_chains);
    }

    #[test]
    fn align_requires_sources() {
        assert!(Cli::try_parse_from(["stackalign", "align"]).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["stackalign", "-q", "-v", "cache", "path"]).is_err());
    }
}
