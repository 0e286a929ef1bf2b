//! Photolyzer: photo sharpness, subject, and centering analysis with an incremental SQLite cache

pub mod analyzer;
pub mod engine;
pub mod export;
pub mod labels;
pub mod pipeline;
pub mod types;
pub mod utils;
pub mod vision;

/// Re-export types for API
pub use types::*;

pub use analyzer::{AnalyzeError, analyze_image};
pub use export::write_summary_json;
pub use pipeline::{ExtensionSet, parse_extensions};
pub use vision::{Capability, DetectionBox, Detector, ModelStatus, VisionModels};

use log::debug;
use std::path::Path;

/// Result alias used by public photolyzer API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Analyze every image under `root`, using and updating the store at `opts.db_path`.
///
/// Files whose size and mtime match the stored record are not decoded again. Records for files
/// that no longer exist under `root` are removed. Per-file decode failures are counted in
/// [`RunStats::errors`]; only a bad root or a store failure returns `Err`.
///
/// ```ignore
/// let models = photolyzer::VisionModels::disabled();
/// let stats = photolyzer::analyze_dir(Path::new("photos"), &Opts::default(), &models)?;
/// assert!(stats.is_success());
/// ```
pub fn analyze_dir(root: &Path, opts: &Opts, models: &VisionModels) -> Result<RunStats> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    pipeline::analyze_dir(root, opts, models)
}
