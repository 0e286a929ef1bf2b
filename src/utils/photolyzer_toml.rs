//! Load `.photolyzer.toml` from a directory (CLI only). Lib callers build [`Opts`](crate::Opts) directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::handlers::RunConfig;
use crate::pipeline::ExtensionSet;
use crate::utils::config::PackagePaths;

#[derive(Debug, Deserialize)]
pub(crate) struct PhotolyzerToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    db_path: Option<String>,
    extensions: Option<Vec<String>>,
    force: Option<bool>,
    verbose: Option<bool>,
    keep_on_walk_error: Option<bool>,
    cascade_dir: Option<String>,
    summary_json: Option<String>,
}

/// Load the config file from `dir` if present. Ok(None) if missing or unreadable.
/// Parse errors are returned so the caller can report them once logging is up.
pub(crate) fn load_photolyzer_toml(dir: &Path) -> anyhow::Result<Option<PhotolyzerToml>> {
    use anyhow::Context;

    let path = dir.join(PackagePaths::get().config_filename());
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    parse_photolyzer_toml(&s)
        .map(Some)
        .with_context(|| format!("parse {}", path.display()))
}

pub(crate) fn parse_photolyzer_toml(s: &str) -> Result<PhotolyzerToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite config field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $target:expr, $field:ident => $target_field:ident) => {
        if let Some(v) = $section.$field {
            $target.$target_field = v;
        }
    };
}

/// Apply file config (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_config(file: &PhotolyzerToml, config: &mut RunConfig) {
    let s = &file.settings;
    if let Some(ref p) = s.db_path {
        config.opts.db_path = PathBuf::from(p);
    }
    if let Some(ref exts) = s.extensions {
        config.opts.extensions = ExtensionSet::from_list(exts.iter().map(String::as_str));
    }
    apply_file_opt!(s, config.opts, force => force);
    apply_file_opt!(s, config.opts, verbose => verbose);
    apply_file_opt!(s, config.opts, keep_on_walk_error => keep_on_walk_error);
    if let Some(ref d) = s.cascade_dir {
        config.cascade_dir = Some(PathBuf::from(d));
    }
    if let Some(ref p) = s.summary_json {
        config.summary_json = Some(PathBuf::from(p));
    }
}
