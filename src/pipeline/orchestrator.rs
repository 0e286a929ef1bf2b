//! Incremental run: scan → lookup → analyze on miss → upsert → reconcile.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use kdam::Animation;
use log::{debug, info, warn};
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;

use crate::analyzer::analyze_image;
use crate::engine::db_ops;
use crate::engine::progress::{
    ProgressBarConfig, create_progress_bar, finish_progress_bar, update_progress_bar,
};
use crate::engine::tools::{canonicalize_root, root_to_db_string};
use crate::types::{AnalysisRecord, Opts, RunStats, ScanEntry};
use crate::utils::config::ProgressConsts;
use crate::vision::VisionModels;

use super::metadata::read_fingerprint;
use super::walk::scan;

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// What happened to one scanned file.
enum FileOutcome {
    Cached,
    Analyzed,
    Failed,
}

/// Analyze every image under `root`, reusing cached results whose fingerprint still matches.
/// Opens (or creates) the store at `opts.db_path`.
pub fn analyze_dir(root: &Path, opts: &Opts, models: &VisionModels) -> Result<RunStats> {
    let root = canonicalize_root(root)?;
    let mut conn = db_ops::open_db(&opts.db_path)
        .with_context(|| format!("open store {}", opts.db_path.display()))?;
    analyze_dir_with_conn(&mut conn, &root, opts, models)
}

/// Same as [`analyze_dir`] against an already open store. `opts.db_path` is ignored.
pub fn analyze_dir_with_conn(
    conn: &mut Connection,
    root: &Path,
    opts: &Opts,
    models: &VisionModels,
) -> Result<RunStats> {
    let root = canonicalize_root(root)?;
    let root_key = root_to_db_string(&root);

    let mut entries: Vec<ScanEntry> = Vec::new();
    let mut walk_errors = 0usize;
    for item in scan(&root, &opts.extensions) {
        match item {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                walk_errors += 1;
                warn!("Skipping unreadable entry: {e:#}");
            }
        }
    }

    if entries.is_empty() {
        info!("No image files found in {}", root.display());
        return Ok(RunStats::default());
    }

    let mut stats = RunStats {
        total: entries.len(),
        ..RunStats::default()
    };
    debug!("Found {} image files under {}", stats.total, root.display());

    let mut bar = opts.verbose.then(|| {
        create_progress_bar(ProgressBarConfig::new(
            stats.total,
            ProgressConsts::DESC,
            Animation::Classic,
        ))
    });

    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
    for entry in &entries {
        seen.insert(entry.rel_path.clone());
        match process_file(conn, &root_key, entry, opts, models)? {
            FileOutcome::Cached => stats.cached += 1,
            FileOutcome::Analyzed => stats.analyzed += 1,
            FileOutcome::Failed => stats.errors += 1,
        }
        update_progress_bar(&mut bar, 1);
    }
    finish_progress_bar(bar);

    if walk_errors > 0 && opts.keep_on_walk_error {
        warn!("{walk_errors} unreadable entries; keeping cached records not seen in this run");
        return Ok(stats);
    }
    stats.deleted = db_ops::reconcile(conn, &root_key, &seen).context("reconcile store")?;
    if stats.deleted > 0 {
        debug!("Removed {} records for files no longer present", stats.deleted);
    }
    Ok(stats)
}

/// Per-file step. Returns Err only for store failures, which end the run.
fn process_file(
    conn: &Connection,
    root_key: &str,
    entry: &ScanEntry,
    opts: &Opts,
    models: &VisionModels,
) -> Result<FileOutcome> {
    let fingerprint = match read_fingerprint(&entry.abs_path) {
        Ok(fp) => fp,
        Err(e) => {
            warn!("{}: {e:#}", entry.rel_path);
            return Ok(FileOutcome::Failed);
        }
    };

    if !opts.force
        && db_ops::lookup(conn, root_key, &entry.rel_path, &fingerprint)?.is_some()
    {
        debug!("cached: {}", entry.rel_path);
        return Ok(FileOutcome::Cached);
    }

    let analysis = match analyze_image(&entry.abs_path, models) {
        Ok(a) => a,
        Err(e) => {
            warn!("{}: {e}", entry.rel_path);
            return Ok(FileOutcome::Failed);
        }
    };
    debug!(
        "analyzed: {} ({}, person={}, pet={}, {})",
        entry.rel_path,
        analysis.blur_category,
        analysis.has_person,
        analysis.has_pet,
        analysis.center_category
    );

    let record = AnalysisRecord {
        root: root_key.to_string(),
        path: entry.rel_path.clone(),
        fingerprint,
        analysis,
        analyzed_at: now_rfc3339(),
    };
    db_ops::upsert(conn, &record)?;
    Ok(FileOutcome::Analyzed)
}
