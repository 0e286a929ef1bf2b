//! Summary export: one JSON array of the stored records for a root.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use crate::engine::db_ops::list_by_root;
use crate::types::{AnalysisRecord, BlurCategory, CenterCategory};
use crate::utils::write_atomic;

/// One exported row.
#[derive(Debug, Serialize)]
pub struct SummaryRow<'a> {
    pub path: &'a str,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub blur_score: f64,
    pub blur_category: BlurCategory,
    pub has_person: bool,
    pub has_pet: bool,
    pub center_score: f64,
    pub center_category: CenterCategory,
    pub analyzed_at: &'a str,
}

impl<'a> From<&'a AnalysisRecord> for SummaryRow<'a> {
    fn from(r: &'a AnalysisRecord) -> Self {
        let a = &r.analysis;
        SummaryRow {
            path: &r.path,
            size_bytes: r.fingerprint.size,
            width: a.width,
            height: a.height,
            blur_score: a.blur_score,
            blur_category: a.blur_category,
            has_person: a.has_person,
            has_pet: a.has_pet,
            center_score: a.center_score,
            center_category: a.center_category,
            analyzed_at: &r.analyzed_at,
        }
    }
}

/// Write every record under `root` to `out` as pretty JSON, ordered by path.
/// The file is replaced atomically. Returns the number of records written.
pub fn write_summary_json(conn: &Connection, root: &str, out: &Path) -> Result<usize> {
    let records = list_by_root(conn, root)?;
    let rows: Vec<SummaryRow<'_>> = records.iter().map(SummaryRow::from).collect();
    let json = serde_json::to_string_pretty(&rows).context("serialize summary")?;
    write_atomic(out, json.as_bytes())
        .with_context(|| format!("write summary {}", out.display()))?;
    Ok(rows.len())
}
