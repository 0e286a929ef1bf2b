use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temporary sibling path used while writing `path`, e.g. `summary.json.tmp`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| crate::utils::PackagePaths::get().pkg_name().to_string());
    path.parent()
        .unwrap_or(Path::new("."))
        .join(format!("{name}.tmp"))
}

/// Write `bytes` to a temp sibling, sync it, then rename over `final_path`.
/// Readers see either the old file or the complete new one.
/// The temp file is removed if any step fails.
pub fn write_atomic(final_path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = temp_path_for(final_path);
    let result = write_synced(&temp_path, bytes)
        .and_then(|()| rename_temp_to_final(&temp_path, final_path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_synced(temp_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(temp_path)
        .with_context(|| format!("create temp file {}", temp_path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("write temp file {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("sync temp file {}", temp_path.display()))
}

pub fn rename_temp_to_final(temp_path: &Path, final_path: &Path) -> Result<()> {
    fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "atomic rename temp file to final path ({} -> {})",
            temp_path.display(),
            final_path.display()
        )
    })
}
