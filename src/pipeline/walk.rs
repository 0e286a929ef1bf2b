//! Directory scan: depth-first walk yielding image files under a root.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::engine::tools::{dotted_extension, is_hidden_name, path_relative_to, path_to_db_string};
use crate::types::ScanEntry;
use crate::utils::config::DEFAULT_EXTENSIONS;

/// Accepted file extensions, lowercase with a leading '.'.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    /// Normalize each item ("JPG", ".png", " tif ") into the set. Empty items are ignored.
    pub fn from_list<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        ExtensionSet(
            items
                .into_iter()
                .map(str::trim)
                .filter(|s| !s.is_empty() && *s != ".")
                .map(|s| {
                    let s = s.to_lowercase();
                    if s.starts_with('.') { s } else { format!(".{s}") }
                })
                .collect(),
        )
    }

    /// True if `path` has one of the accepted extensions (case-insensitive).
    pub fn matches(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.0.contains(&ext))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        ExtensionSet::from_list(DEFAULT_EXTENSIONS)
    }
}

/// Parse a comma-separated extension list such as `"jpg, .PNG"`.
pub fn parse_extensions(s: &str) -> ExtensionSet {
    ExtensionSet::from_list(s.split(','))
}

/// The root itself is never pruned, even when its own name is hidden.
fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !entry.file_name().to_str().is_some_and(is_hidden_name)
}

/// Regular files, plus symlinks that resolve to one. Symlinked directories are not followed.
fn is_file_like(entry: &DirEntry) -> bool {
    let ft = entry.file_type();
    ft.is_file() || (ft.is_symlink() && entry.path().is_file())
}

/// Walk `root` depth-first and yield every regular file with an accepted extension.
/// Hidden directories are not descended into; hidden files are skipped.
/// Walk errors (unreadable directories, vanished entries) are yielded as `Err` for the caller to log.
pub fn scan<'a>(
    root: &'a Path,
    extensions: &'a ExtensionSet,
) -> impl Iterator<Item = Result<ScanEntry>> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_visible)
        .filter_map(move |r| match r {
            Ok(entry) => {
                if !is_file_like(&entry) || !extensions.matches(entry.path()) {
                    return None;
                }
                let abs_path = entry.into_path();
                let rel = path_relative_to(&abs_path, root)?;
                Some(Ok(ScanEntry {
                    rel_path: path_to_db_string(&rel),
                    abs_path,
                }))
            }
            Err(err) => {
                let at = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                Some(Err(err).with_context(|| format!("walk {at}")))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parse_normalizes_case_dots_and_spaces() {
        let set = parse_extensions("jpg, .PNG , ,tif");
        let got: Vec<&str> = set.iter().collect();
        assert_eq!(got, vec![".jpg", ".png", ".tif"]);
    }

    #[test]
    fn default_set_covers_common_formats() {
        let set = ExtensionSet::default();
        for name in ["a.jpg", "a.JPEG", "a.png", "a.gif", "a.bmp", "a.webp", "a.tiff", "a.TIF"] {
            assert!(set.matches(Path::new(name)), "{name}");
        }
        assert!(!set.matches(Path::new("a.txt")));
        assert!(!set.matches(Path::new("jpg")));
    }

    #[test]
    fn scan_prunes_hidden_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("a.jpg"), b"x").unwrap();
        fs::write(root.join("notes.txt"), b"x").unwrap();
        fs::write(root.join(".secret.jpg"), b"x").unwrap();
        fs::write(root.join("sub/B.PNG"), b"x").unwrap();
        fs::write(root.join("sub/deeper/c.jpeg"), b"x").unwrap();
        fs::write(root.join(".hidden/d.jpg"), b"x").unwrap();

        let set = ExtensionSet::default();
        let mut rels: Vec<String> = scan(root, &set).map(|r| r.unwrap().rel_path).collect();
        rels.sort();
        assert_eq!(rels, vec!["a.jpg", "sub/B.PNG", "sub/deeper/c.jpeg"]);
    }

    #[test]
    fn scan_yields_absolute_paths_under_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.png"), b"x").unwrap();
        let set = ExtensionSet::default();
        let entries: Vec<ScanEntry> = scan(dir.path(), &set).map(|r| r.unwrap()).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].abs_path, dir.path().join("x.png"));
    }

    #[cfg(unix)]
    #[test]
    fn scan_includes_file_symlinks_but_not_linked_dirs() {
        use std::os::unix::fs::symlink;

        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("real.png"), b"x").unwrap();
        fs::create_dir(outside.path().join("album")).unwrap();
        fs::write(outside.path().join("album/inner.png"), b"x").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("plain.png"), b"x").unwrap();
        symlink(outside.path().join("real.png"), root.join("link.png")).unwrap();
        symlink(outside.path().join("album"), root.join("album")).unwrap();
        symlink(outside.path().join("missing.png"), root.join("dangling.png")).unwrap();

        let set = ExtensionSet::default();
        let rels: Vec<String> = scan(root, &set).map(|r| r.unwrap().rel_path).collect();
        assert_eq!(rels, vec!["link.png", "plain.png"]);
    }
}
