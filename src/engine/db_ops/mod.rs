//! Analysis store: schema, open, per-record lookup/upsert, reconciliation.

mod connection;
mod store;

pub use connection::{open_db, open_db_in_memory};
pub use store::{count_for_root, list_by_root, lookup, reconcile, upsert};

/// Durability pragmas. Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = FULL;
        PRAGMA wal_autocheckpoint = 1000;
        "#;

/// Schema for the analysis table (idempotent).
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS photo_analysis (
    id INTEGER PRIMARY KEY,
    root TEXT NOT NULL,
    path TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    mtime_ns INTEGER NOT NULL,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    blur_score REAL NOT NULL,
    blur_category TEXT NOT NULL,
    has_person INTEGER NOT NULL,
    has_pet INTEGER NOT NULL,
    center_score REAL NOT NULL,
    center_category TEXT NOT NULL,
    analyzed_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_photo_analysis_root_path ON photo_analysis(root, path);
"#;

/// Columns read back into an [`AnalysisRecord`](crate::AnalysisRecord), in row order.
pub(crate) const RECORD_COLUMNS: &str = "root, path, size_bytes, mtime_ns, width, height, \
     blur_score, blur_category, has_person, has_pet, center_score, center_category, analyzed_at";

/// Insert or replace in place; the row id of an existing (root, path) is kept.
pub(crate) const UPSERT_SQL: &str = r#"
INSERT INTO photo_analysis (
    root, path, size_bytes, mtime_ns, width, height, blur_score, blur_category,
    has_person, has_pet, center_score, center_category, analyzed_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
ON CONFLICT(root, path) DO UPDATE SET
    size_bytes = excluded.size_bytes,
    mtime_ns = excluded.mtime_ns,
    width = excluded.width,
    height = excluded.height,
    blur_score = excluded.blur_score,
    blur_category = excluded.blur_category,
    has_person = excluded.has_person,
    has_pet = excluded.has_pet,
    center_score = excluded.center_score,
    center_category = excluded.center_category,
    analyzed_at = excluded.analyzed_at
"#;
