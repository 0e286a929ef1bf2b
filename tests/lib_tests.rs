use photolyzer::analyzer::{center_score, largest_detection};
use photolyzer::engine::{path_relative_to, path_to_db_string};
use photolyzer::labels::{ConfusionMatrix, HumanLabel, LabelSet, compare};
use photolyzer::vision::group_rectangles;
use photolyzer::{
    BlurCategory, CenterCategory, DetectionBox, ExtensionSet, ImageAnalysis, RunStats,
    parse_extensions,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// --- categorization boundaries ---

#[test]
fn test_blur_category_boundaries() {
    assert_eq!(BlurCategory::from_score(150.0), BlurCategory::Sharp);
    assert_eq!(BlurCategory::from_score(149.99), BlurCategory::Soft);
    assert_eq!(BlurCategory::from_score(50.0), BlurCategory::Soft);
    assert_eq!(BlurCategory::from_score(49.99), BlurCategory::Blurry);
    assert_eq!(BlurCategory::from_score(0.0), BlurCategory::Blurry);
}

#[test]
fn test_center_category_boundaries() {
    assert_eq!(CenterCategory::from_score(0.0), CenterCategory::WellCentered);
    assert_eq!(CenterCategory::from_score(0.15), CenterCategory::WellCentered);
    assert_eq!(CenterCategory::from_score(0.1501), CenterCategory::SomewhatCentered);
    assert_eq!(CenterCategory::from_score(0.35), CenterCategory::SomewhatCentered);
    assert_eq!(CenterCategory::from_score(0.3501), CenterCategory::OffCenter);
}

#[test]
fn test_category_strings_round_trip() {
    for c in BlurCategory::ALL {
        assert_eq!(c.as_str().parse::<BlurCategory>().unwrap(), c);
    }
    for c in CenterCategory::ALL {
        assert_eq!(c.to_string().parse::<CenterCategory>().unwrap(), c);
    }
    assert!("fuzzy".parse::<BlurCategory>().is_err());
}

// --- centering ---

#[test]
fn test_center_score_corner_box() {
    // Box centered at (10, 10) in a 100x100 image.
    let b = DetectionBox::new(0, 0, 20, 20);
    let expected = (0.4f64 * 0.4 * 2.0).sqrt();
    assert!((center_score(&b, 100, 100) - expected).abs() < 1e-12);
}

#[test]
fn test_largest_detection_by_area() {
    let small = DetectionBox::new(0, 0, 10, 10);
    let big = DetectionBox::new(50, 50, 40, 30);
    assert_eq!(largest_detection(&[small, big]), Some(big));
}

// --- extensions and paths ---

#[test]
fn test_parse_extensions_matches_case_insensitively() {
    let set = parse_extensions("JPG, .heic");
    assert!(set.matches(Path::new("a/b/photo.jpg")));
    assert!(set.matches(Path::new("IMG_0001.HEIC")));
    assert!(!set.matches(Path::new("photo.png")));
}

#[test]
fn test_empty_extension_list_matches_nothing() {
    let set = parse_extensions(" , ");
    assert!(set.is_empty());
    assert!(!set.matches(Path::new("a.jpg")));
    assert!(!ExtensionSet::default().is_empty());
}

#[test]
fn test_path_relative_and_db_string() {
    let base = PathBuf::from("/foo/bar");
    let rel = path_relative_to(Path::new("/foo/bar/baz/q.jpg"), &base).unwrap();
    assert_eq!(path_to_db_string(&rel), "baz/q.jpg");
    assert_eq!(path_relative_to(Path::new("/other/q.jpg"), &base), None);
}

// --- grouping ---

#[test]
fn test_group_rectangles_keeps_well_supported_clusters() {
    let mut rects = Vec::new();
    for dx in 0..6 {
        rects.push(DetectionBox::new(100 + dx, 100, 50, 50));
    }
    rects.push(DetectionBox::new(400, 10, 30, 30));
    let out = group_rectangles(&rects, 5, 0.2);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].width, 50);
    assert!(out[0].x >= 102 && out[0].x <= 103);
}

// --- run stats ---

#[test]
fn test_run_stats_success_only_without_errors() {
    assert!(RunStats::default().is_success());
    let stats = RunStats {
        total: 3,
        analyzed: 2,
        errors: 1,
        ..RunStats::default()
    };
    assert!(!stats.is_success());
}

// --- metrics and comparison ---

#[test]
fn test_metrics_from_matrix() {
    let m = ConfusionMatrix {
        tp: 6,
        fp: 2,
        tn: 10,
        fn_: 2,
    };
    let metrics = m.metrics();
    assert_eq!(metrics.precision, 0.75);
    assert_eq!(metrics.recall, 0.75);
    assert!((metrics.f1 - 0.75).abs() < 1e-12);
    assert_eq!(metrics.accuracy, 0.8);
    assert_eq!(metrics.matrix.total(), 20);
}

#[test]
fn test_metrics_zero_denominators_are_zero() {
    let metrics = ConfusionMatrix::default().metrics();
    assert_eq!(metrics.precision, 0.0);
    assert_eq!(metrics.recall, 0.0);
    assert_eq!(metrics.f1, 0.0);
    assert_eq!(metrics.accuracy, 0.0);

    let only_negatives = ConfusionMatrix {
        tn: 4,
        ..ConfusionMatrix::default()
    };
    assert_eq!(only_negatives.metrics().accuracy, 1.0);
    assert_eq!(only_negatives.metrics().precision, 0.0);
}

fn label(person: bool, cat: bool, dog: bool) -> HumanLabel {
    HumanLabel {
        has_person: person,
        has_dog: dog,
        has_cat: cat,
        has_other_pet: false,
        blur_category: BlurCategory::Sharp,
        center_category: CenterCategory::WellCentered,
    }
}

fn auto(person: bool, pet: bool) -> ImageAnalysis {
    ImageAnalysis {
        width: 10,
        height: 10,
        blur_score: 200.0,
        blur_category: BlurCategory::Sharp,
        has_person: person,
        has_pet: pet,
        center_score: 0.0,
        center_category: CenterCategory::WellCentered,
    }
}

#[test]
fn test_compare_builds_matrices_and_mismatch_lists() {
    let mut labels = LabelSet::new();
    labels.insert("tp.jpg".into(), label(true, true, false));
    labels.insert("fp.jpg".into(), label(false, false, true));
    labels.insert("fn.jpg".into(), label(true, true, false));
    labels.insert("tn.jpg".into(), label(false, false, false));
    labels.insert("lost.jpg".into(), label(true, false, false));

    let mut results = BTreeMap::new();
    results.insert("tp.jpg".to_string(), auto(true, true));
    results.insert("fp.jpg".to_string(), auto(true, true));
    results.insert("fn.jpg".to_string(), auto(false, false));
    results.insert("tn.jpg".to_string(), auto(false, false));
    results.insert("unlabeled.jpg".to_string(), auto(true, true));

    let cmp = compare(&labels, &results);
    assert_eq!(
        cmp.person,
        ConfusionMatrix {
            tp: 1,
            fp: 1,
            tn: 1,
            fn_: 1
        }
    );
    assert_eq!(cmp.cat, cmp.person);
    assert_eq!(cmp.person_fp, vec!["fp.jpg"]);
    assert_eq!(cmp.person_fn, vec!["fn.jpg"]);
    assert_eq!(cmp.cat_fp, vec!["fp.jpg"]);
    assert_eq!(cmp.cat_fn, vec!["fn.jpg"]);
    assert_eq!(cmp.missing, vec!["lost.jpg"]);
}
