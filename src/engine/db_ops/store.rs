//! Per-record store operations keyed by (root, relative path).

use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashSet;
use std::str::FromStr;

use crate::types::{AnalysisRecord, BlurCategory, CenterCategory, FileFingerprint, ImageAnalysis};

use super::{RECORD_COLUMNS, UPSERT_SQL};

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s: String = row.get(idx)?;
    T::from_str(&s).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Map a row selected with [`RECORD_COLUMNS`].
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<AnalysisRecord> {
    let size: i64 = row.get(2)?;
    Ok(AnalysisRecord {
        root: row.get(0)?,
        path: row.get(1)?,
        fingerprint: FileFingerprint {
            size: size.max(0) as u64,
            mtime_ns: row.get(3)?,
        },
        analysis: ImageAnalysis {
            width: row.get(4)?,
            height: row.get(5)?,
            blur_score: row.get(6)?,
            blur_category: parse_column::<BlurCategory>(row, 7)?,
            has_person: row.get(8)?,
            has_pet: row.get(9)?,
            center_score: row.get(10)?,
            center_category: parse_column::<CenterCategory>(row, 11)?,
        },
        analyzed_at: row.get(12)?,
    })
}

/// Cached record for (root, path), only when its stored fingerprint equals `fingerprint`.
pub fn lookup(
    conn: &Connection,
    root: &str,
    path: &str,
    fingerprint: &FileFingerprint,
) -> Result<Option<AnalysisRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM photo_analysis \
         WHERE root = ?1 AND path = ?2 AND size_bytes = ?3 AND mtime_ns = ?4"
    );
    conn.query_row(
        &sql,
        params![root, path, fingerprint.size as i64, fingerprint.mtime_ns],
        row_to_record,
    )
    .optional()
    .with_context(|| format!("lookup {path}"))
}

/// Insert or update the record for (root, path) in one statement. Committed on return.
pub fn upsert(conn: &Connection, record: &AnalysisRecord) -> Result<()> {
    let a = &record.analysis;
    conn.execute(
        UPSERT_SQL,
        params![
            record.root,
            record.path,
            record.fingerprint.size as i64,
            record.fingerprint.mtime_ns,
            a.width,
            a.height,
            a.blur_score,
            a.blur_category.as_str(),
            a.has_person,
            a.has_pet,
            a.center_score,
            a.center_category.as_str(),
            record.analyzed_at,
        ],
    )
    .with_context(|| format!("upsert {}", record.path))?;
    Ok(())
}

/// All records under `root`, ordered by path.
pub fn list_by_root(conn: &Connection, root: &str) -> Result<Vec<AnalysisRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM photo_analysis WHERE root = ?1 ORDER BY path");
    let mut stmt = conn.prepare(&sql).context("prepare list")?;
    let rows = stmt.query_map([root], row_to_record)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("read record")?);
    }
    Ok(out)
}

pub fn count_for_root(conn: &Connection, root: &str) -> Result<usize> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM photo_analysis WHERE root = ?1",
            [root],
            |row| row.get(0),
        )
        .context("count records")?;
    Ok(n.max(0) as usize)
}

/// Delete every record under `root` whose path is not in `seen`, in one transaction.
/// Returns the number of rows deleted.
pub fn reconcile(conn: &mut Connection, root: &str, seen: &HashSet<String>) -> Result<usize> {
    let stored: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT path FROM photo_analysis WHERE root = ?1")
            .context("prepare stored paths")?;
        let rows = stmt.query_map([root], |row| row.get::<_, String>(0))?;
        rows.collect::<rusqlite::Result<_>>()
            .context("read stored paths")?
    };

    let stale: Vec<&String> = stored.iter().filter(|p| !seen.contains(*p)).collect();
    if stale.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction().context("begin transaction")?;
    let mut deleted = 0;
    {
        let mut stmt = tx
            .prepare("DELETE FROM photo_analysis WHERE root = ?1 AND path = ?2")
            .context("prepare delete")?;
        for path in &stale {
            deleted += stmt
                .execute(params![root, path])
                .with_context(|| format!("delete {path}"))?;
        }
    }
    tx.commit().context("commit transaction")?;
    Ok(deleted)
}
