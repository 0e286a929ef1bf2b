use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Photo sharpness, subject, and centering analysis with an incremental SQLite cache.
#[derive(Clone, Parser)]
#[command(name = "photolyzer")]
#[command(about = "Analyze photo collections; re-runs only touch new or changed files.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Analyze every image under DIR and update the cache.
    Analyze(AnalyzeArgs),
    /// Run live analysis on DIR and score it against a labels file.
    Compare(CompareArgs),
    /// Print statistics for a labels file.
    Labels(LabelsArgs),
}

/// Flags shared by commands that run detection.
#[derive(Clone, Args)]
pub struct CommonArgs {
    /// Directory holding the Haar cascade XML files. Default: PHOTOLYZER_CASCADE_DIR or the OpenCV install.
    #[arg(long, value_name = "DIR")]
    pub cascade_dir: Option<PathBuf>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

#[derive(Clone, Args)]
pub struct AnalyzeArgs {
    /// Directory of photos to analyze.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Path to the cache database. Default: photo_cache.sqlite in the current directory.
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Also write the stored results for DIR to this JSON file.
    #[arg(long, value_name = "PATH")]
    pub summary_json: Option<PathBuf>,

    /// Comma-separated extensions to analyze, e.g. "jpg,png".
    #[arg(long, short = 'e', value_name = "LIST")]
    pub extensions: Option<String>,

    /// Re-analyze every file, ignoring cached results.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub force: Option<bool>,

    /// Keep cached records when part of DIR cannot be read, instead of pruning them.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub keep_on_walk_error: Option<bool>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Clone, Args)]
pub struct CompareArgs {
    /// Labels JSON file.
    #[arg(value_name = "LABELS")]
    pub labels: PathBuf,

    /// Directory of the labeled photos.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Clone, Args)]
pub struct LabelsArgs {
    /// Labels JSON file.
    #[arg(value_name = "LABELS")]
    pub labels: PathBuf,
}
