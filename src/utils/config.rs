//! Application configuration constants.
//! Thresholds, detector tuning, and package-derived filenames in one place.

use std::path::PathBuf;
use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    cascade_dir_env: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                cascade_dir_env: format!("{}_CASCADE_DIR", pkg.to_uppercase()),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Default cache database filename (relative to the invocation directory).
    pub fn db_filename(&self) -> &str {
        DEFAULT_DB_FILENAME
    }

    /// Optional per-directory config file, e.g. `.photolyzer.toml`.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable naming the cascade directory, e.g. `PHOTOLYZER_CASCADE_DIR`.
    pub fn cascade_dir_env(&self) -> &str {
        &self.cascade_dir_env
    }
}

pub const DEFAULT_DB_FILENAME: &str = "photo_cache.sqlite";

// ---- Scanning ----

/// Extensions analyzed when none are given.
pub const DEFAULT_EXTENSIONS: [&str; 8] = [
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tiff", ".tif",
];

// ---- Categorization ----

pub const BLUR_THRESHOLD_SHARP: f64 = 150.0;
pub const BLUR_THRESHOLD_SOFT: f64 = 50.0;

/// Normalized distance from center.
pub const CENTER_THRESHOLD_WELL: f64 = 0.15;
pub const CENTER_THRESHOLD_SOMEWHAT: f64 = 0.35;

/// Decimal places kept when storing scores.
pub const BLUR_SCORE_DECIMALS: i32 = 2;
pub const CENTER_SCORE_DECIMALS: i32 = 4;

// ---- Detection ----

/// Cascade tuning per capability.
pub struct DetectorConsts;

impl DetectorConsts {
    pub const SCALE_FACTOR: f64 = 1.1;
    pub const FACE_MIN_NEIGHBORS: usize = 5;
    pub const CAT_FACE_MIN_NEIGHBORS: usize = 3;
    pub const FACE_MIN_SIZE: (u32, u32) = (30, 30);
    pub const CAT_FACE_MIN_SIZE: (u32, u32) = (40, 40);
    /// Relative tolerance when grouping overlapping candidate windows.
    pub const GROUP_EPS: f64 = 0.2;

    pub const FACE_CASCADES: &'static [&'static str] = &["haarcascade_frontalface_default.xml"];
    /// Tried in order; first one that loads wins.
    pub const CAT_FACE_CASCADES: &'static [&'static str] = &[
        "haarcascade_frontalcatface_extended.xml",
        "haarcascade_frontalcatface.xml",
    ];
}

/// Usual OpenCV install locations for the bundled Haar cascades.
const CASCADE_SEARCH_DIRS: [&str; 5] = [
    "/usr/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/local/share/opencv/haarcascades",
    "/opt/homebrew/share/opencv4/haarcascades",
];

/// Cascade directory: explicit value, then the package env var, then the first existing search dir.
pub fn resolve_cascade_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    if let Ok(dir) = std::env::var(PackagePaths::get().cascade_dir_env())
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    CASCADE_SEARCH_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_dir())
}

// ---- Reporting ----

/// Mismatch lists print at most this many filenames before "... and N more".
pub const MISMATCH_LIST_LIMIT: usize = 10;

/// Below these, the comparison report flags cat detection as needing work.
pub const CAT_RECALL_FLOOR: f64 = 0.7;
pub const CAT_PRECISION_FLOOR: f64 = 0.8;

/// Progress bar and summary formatting.
pub struct ProgressConsts;

impl ProgressConsts {
    pub const DESC: &'static str = "Analyzing";
    pub const SUMMARY_RULE_WIDTH: usize = 50;
    pub const REPORT_RULE_WIDTH: usize = 70;
    pub const LABEL_RULE_WIDTH: usize = 60;
}
