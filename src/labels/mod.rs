//! Ground-truth labels: load, summarize, and score automated results against them.

pub mod report;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analyzer::analyze_image;
use crate::pipeline::ExtensionSet;
use crate::types::{BlurCategory, CenterCategory, ImageAnalysis};
use crate::vision::VisionModels;

pub use report::{insights, print_comparison, print_label_stats, recommendations};

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("cannot read labels {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Not a JSON object at all.
    #[error("invalid labels JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// One entry is missing a key or has a wrong value type.
    #[error("label for {entry:?}: {message}")]
    Schema { entry: String, message: String },
}

/// Human judgment for one photo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanLabel {
    pub has_person: bool,
    pub has_dog: bool,
    pub has_cat: bool,
    pub has_other_pet: bool,
    pub blur_category: BlurCategory,
    pub center_category: CenterCategory,
}

/// Filename → label. Sorted so reports are stable.
pub type LabelSet = BTreeMap<String, HumanLabel>;

/// Parse a label document: a JSON object mapping filename to label.
pub fn parse_labels(json: &str) -> Result<LabelSet, LabelError> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
    raw.into_iter()
        .map(|(entry, value)| match serde_json::from_value::<HumanLabel>(value) {
            Ok(label) => Ok((entry, label)),
            Err(e) => Err(LabelError::Schema {
                entry,
                message: e.to_string(),
            }),
        })
        .collect()
}

pub fn load_labels(path: &Path) -> Result<LabelSet, LabelError> {
    let s = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_labels(&s)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LabelStats {
    pub total: usize,
    pub people: usize,
    pub dogs: usize,
    pub cats: usize,
    pub other_pets: usize,
    pub blur: BTreeMap<BlurCategory, usize>,
    pub center: BTreeMap<CenterCategory, usize>,
    /// "none", or present subjects sorted and joined with '+', e.g. "cat+person".
    pub combinations: BTreeMap<String, usize>,
}

/// Subject combination key for one label. Other pets do not take part.
pub fn subject_combination(label: &HumanLabel) -> String {
    let mut subjects = Vec::new();
    if label.has_cat {
        subjects.push("cat");
    }
    if label.has_dog {
        subjects.push("dog");
    }
    if label.has_person {
        subjects.push("person");
    }
    if subjects.is_empty() {
        "none".to_string()
    } else {
        subjects.join("+")
    }
}

pub fn label_stats(labels: &LabelSet) -> LabelStats {
    let mut stats = LabelStats {
        total: labels.len(),
        ..LabelStats::default()
    };
    for label in labels.values() {
        stats.people += label.has_person as usize;
        stats.dogs += label.has_dog as usize;
        stats.cats += label.has_cat as usize;
        stats.other_pets += label.has_other_pet as usize;
        *stats.blur.entry(label.blur_category).or_default() += 1;
        *stats.center.entry(label.center_category).or_default() += 1;
        *stats.combinations.entry(subject_combination(label)).or_default() += 1;
    }
    stats
}

/// Analyze the top-level images of `dir` directly (no store). Keyed by file name.
/// Files that fail to decode are logged and left out.
pub fn run_live_analysis(
    dir: &Path,
    models: &VisionModels,
) -> anyhow::Result<BTreeMap<String, ImageAnalysis>> {
    use anyhow::Context;

    let extensions = ExtensionSet::default();
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("read directory {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && extensions.matches(p))
        .collect();
    files.sort();

    let mut results = BTreeMap::new();
    for (i, path) in files.iter().enumerate() {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        match analyze_image(path, models) {
            Ok(a) => {
                debug!("[{}/{}] {}", i + 1, files.len(), name);
                results.insert(name, a);
            }
            Err(e) => warn!("Error analyzing {name}: {e}"),
        }
    }
    Ok(results)
}

/// Binary-classification tally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, truth: bool, predicted: bool) {
        match (truth, predicted) {
            (true, true) => self.tp += 1,
            (false, false) => self.tn += 1,
            (false, true) => self.fp += 1,
            (true, false) => self.fn_ += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// Ratios are 0.0 when their denominator is zero.
    pub fn metrics(&self) -> Metrics {
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
        let precision = ratio(self.tp, self.tp + self.fp);
        let recall = ratio(self.tp, self.tp + self.fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Metrics {
            precision,
            recall,
            f1,
            accuracy: ratio(self.tp + self.tn, self.total()),
            matrix: *self,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    pub matrix: ConfusionMatrix,
}

/// Labels vs automated results. Dogs are not scored: nothing detects them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub person: ConfusionMatrix,
    /// Labeled `has_cat` against detected `has_pet`.
    pub cat: ConfusionMatrix,
    pub person_fp: Vec<String>,
    pub person_fn: Vec<String>,
    pub cat_fp: Vec<String>,
    pub cat_fn: Vec<String>,
    /// Labeled files with no automated result.
    pub missing: Vec<String>,
}

pub fn compare(labels: &LabelSet, auto: &BTreeMap<String, ImageAnalysis>) -> Comparison {
    let mut cmp = Comparison::default();
    for (name, label) in labels {
        let Some(result) = auto.get(name) else {
            cmp.missing.push(name.clone());
            continue;
        };

        cmp.person.record(label.has_person, result.has_person);
        match (label.has_person, result.has_person) {
            (false, true) => cmp.person_fp.push(name.clone()),
            (true, false) => cmp.person_fn.push(name.clone()),
            _ => {}
        }

        cmp.cat.record(label.has_cat, result.has_pet);
        match (label.has_cat, result.has_pet) {
            (false, true) => cmp.cat_fp.push(name.clone()),
            (true, false) => cmp.cat_fn.push(name.clone()),
            _ => {}
        }
    }
    cmp
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "a.jpg": {"has_person": true, "has_dog": false, "has_cat": true, "has_other_pet": false,
                  "blur_category": "sharp", "center_category": "well_centered"},
        "b.jpg": {"has_person": false, "has_dog": true, "has_cat": false, "has_other_pet": true,
                  "blur_category": "blurry", "center_category": "off_center", "note": "extra"}
    }"#;

    #[test]
    fn parses_and_ignores_unknown_keys() {
        let labels = parse_labels(DOC).unwrap();
        assert_eq!(labels.len(), 2);
        assert!(labels["a.jpg"].has_cat);
        assert_eq!(labels["b.jpg"].center_category, CenterCategory::OffCenter);
    }

    #[test]
    fn missing_key_names_the_entry() {
        let err = parse_labels(r#"{"x.png": {"has_person": true}}"#).unwrap_err();
        match err {
            LabelError::Schema { entry, message } => {
                assert_eq!(entry, "x.png");
                assert!(message.contains("has_dog"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_object_document_is_json_error() {
        assert!(matches!(parse_labels("[1, 2]"), Err(LabelError::Json(_))));
    }

    #[test]
    fn stats_count_subjects_and_combinations() {
        let stats = label_stats(&parse_labels(DOC).unwrap());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.people, 1);
        assert_eq!(stats.dogs, 1);
        assert_eq!(stats.cats, 1);
        assert_eq!(stats.other_pets, 1);
        assert_eq!(stats.blur[&BlurCategory::Sharp], 1);
        assert_eq!(stats.combinations["cat+person"], 1);
        assert_eq!(stats.combinations["dog"], 1);
    }
}
