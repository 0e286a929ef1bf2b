use anyhow::{Context, Result};
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::types::FileFingerprint;

/// Size and mtime of `path`. Times before the epoch come out negative.
pub fn read_fingerprint(path: &Path) -> Result<FileFingerprint> {
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    let modified = meta
        .modified()
        .with_context(|| format!("read mtime of {}", path.display()))?;
    let mtime_ns = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i64,
        Err(e) => -(e.duration().as_nanos() as i64),
    };
    Ok(FileFingerprint {
        size: meta.len(),
        mtime_ns,
    })
}
