//! Public and internal types for the photolyzer API and pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::utils::config::{
    BLUR_THRESHOLD_SHARP, BLUR_THRESHOLD_SOFT, CENTER_THRESHOLD_SOMEWHAT, CENTER_THRESHOLD_WELL,
};

/// Cheap content-version identity for a file: size plus modification time.
/// Equal fingerprints mean the file is assumed unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileFingerprint {
    /// File size in bytes.
    pub size: u64,
    /// Modification time in nanoseconds since epoch.
    pub mtime_ns: i64,
}

/// One file found by the scanner: absolute path and path relative to the scanned root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanEntry {
    pub abs_path: PathBuf,
    pub rel_path: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlurCategory {
    Sharp,
    Soft,
    Blurry,
}

impl BlurCategory {
    /// Lower bound of each band is inclusive: 150.0 is sharp, 50.0 is soft.
    pub fn from_score(blur_score: f64) -> Self {
        if blur_score >= BLUR_THRESHOLD_SHARP {
            BlurCategory::Sharp
        } else if blur_score >= BLUR_THRESHOLD_SOFT {
            BlurCategory::Soft
        } else {
            BlurCategory::Blurry
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlurCategory::Sharp => "sharp",
            BlurCategory::Soft => "soft",
            BlurCategory::Blurry => "blurry",
        }
    }

    pub const ALL: [BlurCategory; 3] = [BlurCategory::Sharp, BlurCategory::Soft, BlurCategory::Blurry];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterCategory {
    WellCentered,
    SomewhatCentered,
    OffCenter,
}

impl CenterCategory {
    /// Upper bound of each band is inclusive: 0.15 is well centered, 0.35 somewhat.
    pub fn from_score(center_score: f64) -> Self {
        if center_score <= CENTER_THRESHOLD_WELL {
            CenterCategory::WellCentered
        } else if center_score <= CENTER_THRESHOLD_SOMEWHAT {
            CenterCategory::SomewhatCentered
        } else {
            CenterCategory::OffCenter
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CenterCategory::WellCentered => "well_centered",
            CenterCategory::SomewhatCentered => "somewhat_centered",
            CenterCategory::OffCenter => "off_center",
        }
    }

    pub const ALL: [CenterCategory; 3] = [
        CenterCategory::WellCentered,
        CenterCategory::SomewhatCentered,
        CenterCategory::OffCenter,
    ];
}

/// Error for a category string that is not one of the known values.
#[derive(Debug, thiserror::Error)]
#[error("unknown category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for BlurCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlurCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl FromStr for CenterCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CenterCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for BlurCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CenterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analyzing one image (what the analyzer computes, before it is keyed and stored).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageAnalysis {
    pub width: u32,
    pub height: u32,
    /// Variance of Laplacian, rounded to 2 decimals.
    pub blur_score: f64,
    pub blur_category: BlurCategory,
    pub has_person: bool,
    pub has_pet: bool,
    /// Normalized distance of the largest detection from the image center, rounded to 4 decimals.
    pub center_score: f64,
    pub center_category: CenterCategory,
}

/// One row of the analysis store. Unique per (`root`, `path`).
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRecord {
    /// Canonical absolute path of the scanned tree.
    pub root: String,
    /// Path relative to `root`, forward slashes.
    pub path: String,
    pub fingerprint: FileFingerprint,
    pub analysis: ImageAnalysis,
    /// RFC 3339 UTC timestamp.
    pub analyzed_at: String,
}

/// Per-run aggregate counts returned by [`analyze_dir`](crate::analyze_dir).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub analyzed: usize,
    pub cached: usize,
    pub errors: usize,
    pub deleted: usize,
}

impl RunStats {
    /// A run succeeds only when no file failed.
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

/// Options for one analysis run (CLI and lib).
#[derive(Clone, Debug)]
pub struct Opts {
    /// SQLite cache path.
    pub db_path: PathBuf,
    /// Accepted extensions, lowercase with leading '.'.
    pub extensions: crate::pipeline::ExtensionSet,
    /// Re-analyze every file regardless of cached fingerprints.
    pub force: bool,
    /// Show progress bar and per-file debug logging.
    pub verbose: bool,
    /// Skip removing stale records when any part of the tree could not be read.
    pub keep_on_walk_error: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Opts {
            db_path: PathBuf::from(crate::utils::PackagePaths::get().db_filename()),
            extensions: crate::pipeline::ExtensionSet::default(),
            force: false,
            verbose: false,
            keep_on_walk_error: false,
        }
    }
}
