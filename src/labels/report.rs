//! Console reports for label statistics and label comparisons.

use colored::Colorize;

use crate::types::{BlurCategory, CenterCategory};
use crate::utils::Colors;
use crate::utils::config::{
    CAT_PRECISION_FLOOR, CAT_RECALL_FLOOR, MISMATCH_LIST_LIMIT, ProgressConsts,
};

use super::{Comparison, ConfusionMatrix, LabelSet, LabelStats};

fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn rule(width: usize) -> String {
    "=".repeat(width)
}

fn header(title: &str, width: usize) {
    println!("{}", rule(width));
    println!("{}", Colors::colorize(Colors::HEADER, title));
    println!("{}", rule(width));
}

/// "well_centered" → "Well Centered".
fn display_name(key: &str) -> String {
    key.split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// At most `limit` bullet lines, then "... and N more".
pub fn mismatch_lines(names: &[String], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = names.iter().take(limit).map(|n| format!("  • {n}")).collect();
    if names.len() > limit {
        lines.push(format!("  ... and {} more", names.len() - limit));
    }
    lines
}

/// Observations about a label set: which detectors it can validate, image quality,
/// and single-subject photos usable as training data.
pub fn insights(stats: &LabelStats) -> Vec<String> {
    let mut lines = Vec::new();
    if stats.dogs > 0 {
        lines.push(format!("Dog detection needed: {} photos contain dogs", stats.dogs));
        lines.push("  → only cat faces are detected among pets".to_string());
    }
    if stats.cats > 0 {
        lines.push(format!("Cat detection can be validated: {} photos contain cats", stats.cats));
    }
    if stats.people > 0 {
        lines.push(format!(
            "Person detection can be validated: {} photos contain people",
            stats.people
        ));
        lines.push("  → watch for cat faces detected as human faces".to_string());
    }

    let count = |c: BlurCategory| stats.blur.get(&c).copied().unwrap_or(0);
    lines.push("Image quality:".to_string());
    lines.push(format!("  → {:.1}% sharp", pct(count(BlurCategory::Sharp), stats.total)));
    lines.push(format!("  → {:.1}% blurry", pct(count(BlurCategory::Blurry), stats.total)));

    lines.push("Single-subject photos:".to_string());
    for (key, what) in [("dog", "dog-only"), ("cat", "cat-only"), ("person", "person-only")] {
        let n = stats.combinations.get(key).copied().unwrap_or(0);
        if n > 0 {
            lines.push(format!("  → {n} {what} photos"));
        }
    }
    lines
}

pub fn print_label_stats(stats: &LabelStats) {
    header("HUMAN LABEL ANALYSIS", ProgressConsts::LABEL_RULE_WIDTH);
    let total = stats.total;
    println!("\nTotal Photos Labeled: {total}");

    println!("\nSubject Detection:");
    for (name, count) in [
        ("People", stats.people),
        ("Dogs", stats.dogs),
        ("Cats", stats.cats),
        ("Other Pets", stats.other_pets),
    ] {
        println!("  • {:<11} {count:3} ({:5.1}%)", format!("{name}:"), pct(count, total));
    }

    println!("\nBlur Quality Distribution:");
    for cat in BlurCategory::ALL {
        let count = stats.blur.get(&cat).copied().unwrap_or(0);
        println!("  • {:<6}: {count:3} ({:5.1}%)", display_name(cat.as_str()), pct(count, total));
    }

    println!("\nCentering Distribution:");
    for cat in CenterCategory::ALL {
        let count = stats.center.get(&cat).copied().unwrap_or(0);
        println!("  • {:<18}: {count:3} ({:5.1}%)", display_name(cat.as_str()), pct(count, total));
    }

    println!("\nSubject Combinations:");
    let mut combos: Vec<(&String, &usize)> = stats.combinations.iter().collect();
    combos.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (combo, &count) in combos {
        println!("  • {combo:<20}: {count:3} ({:5.1}%)", pct(count, total));
    }

    println!();
    header("INSIGHTS", ProgressConsts::LABEL_RULE_WIDTH);
    for line in insights(stats) {
        println!("{line}");
    }
}

fn print_matrix(name: &str, m: &ConfusionMatrix) {
    let metrics = m.metrics();
    println!("\n{} DETECTION:", name.to_uppercase().bold());
    println!("  Accuracy:  {:5.1}%", metrics.accuracy * 100.0);
    println!("  Precision: {:5.1}% (of detected, how many were correct)", metrics.precision * 100.0);
    println!("  Recall:    {:5.1}% (of actual, how many were detected)", metrics.recall * 100.0);
    println!("  F1 Score:  {:5.1}%", metrics.f1 * 100.0);
    println!("\n  Confusion Matrix:");
    println!("    True Positives:  {:3} (correctly detected)", m.tp);
    println!("    False Positives: {:3} (detected but not present)", m.fp);
    println!("    True Negatives:  {:3} (correctly not detected)", m.tn);
    println!("    False Negatives: {:3} (present but not detected)", m.fn_);
}

fn print_mismatches(title: &str, color: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }
    println!("\n{}", Colors::colorize(color, &format!("{title} ({}):", names.len())));
    for line in mismatch_lines(names, MISMATCH_LIST_LIMIT) {
        println!("{line}");
    }
}

/// Rule-based advice from the comparison. One verdict each for person and cat detection.
pub fn recommendations(cmp: &Comparison, labels: &LabelSet) -> Vec<String> {
    let mut lines = Vec::new();

    let dogs = labels.values().filter(|l| l.has_dog).count();
    lines.push("Dog detection:".to_string());
    lines.push(format!(
        "  • {dogs} photos contain dogs ({:.1}%)",
        pct(dogs, labels.len())
    ));
    lines.push("  • No dog detector is configured; these photos are not scored".to_string());

    let p = &cmp.person;
    lines.push("Person detection:".to_string());
    if p.fp > p.tp {
        lines.push(format!(
            "  • High false positive rate: {} false vs {} correct",
            p.fp, p.tp
        ));
        lines.push("  • Raise min_neighbors; cat faces may be matching as human faces".to_string());
    } else if p.fn_ > p.tp {
        lines.push(format!(
            "  • High miss rate: missing {} of {} people",
            p.fn_,
            p.fn_ + p.tp
        ));
        lines.push("  • Lower scale_factor or min_neighbors to be more sensitive".to_string());
    } else {
        lines.push(format!(
            "  • Reasonable performance: {:.1}% accuracy",
            p.metrics().accuracy * 100.0
        ));
    }

    let cat = cmp.cat.metrics();
    lines.push("Cat detection:".to_string());
    if cat.recall < CAT_RECALL_FLOOR {
        lines.push(format!(
            "  • Missing cats: only {:.1}% of cats detected",
            cat.recall * 100.0
        ));
        lines.push("  • Loosen detection parameters or try another cat face cascade".to_string());
    } else if cat.precision < CAT_PRECISION_FLOOR {
        lines.push(format!(
            "  • False positives: {:.1}% of cat detections are wrong",
            (1.0 - cat.precision) * 100.0
        ));
        lines.push("  • Raise min_neighbors".to_string());
    } else {
        lines.push(format!("  • Good performance: {:.1}% F1 score", cat.f1 * 100.0));
    }
    lines
}

pub fn print_comparison(cmp: &Comparison, labels: &LabelSet) {
    let width = ProgressConsts::REPORT_RULE_WIDTH;
    header("AUTOMATED vs HUMAN LABEL COMPARISON", width);
    print_matrix("person", &cmp.person);
    print_matrix("cat", &cmp.cat);

    println!();
    header("MISMATCHES REQUIRING ATTENTION", width);
    print_mismatches(
        "FALSE POSITIVES - Person detected but NOT present",
        Colors::BAD,
        &cmp.person_fp,
    );
    print_mismatches(
        "FALSE NEGATIVES - Person present but NOT detected",
        Colors::WARN,
        &cmp.person_fn,
    );
    print_mismatches(
        "FALSE POSITIVES - Cat detected but NOT present",
        Colors::BAD,
        &cmp.cat_fp,
    );
    print_mismatches(
        "FALSE NEGATIVES - Cat present but NOT detected",
        Colors::WARN,
        &cmp.cat_fn,
    );
    print_mismatches("NOT ANALYZED - labeled but no result", Colors::WARN, &cmp.missing);

    println!();
    header("RECOMMENDATIONS", width);
    for line in recommendations(cmp, labels) {
        println!("{line}");
    }
    println!("\n{}", rule(width));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{HumanLabel, label_stats};

    fn label(person: bool, dog: bool, cat: bool, blur: BlurCategory) -> HumanLabel {
        HumanLabel {
            has_person: person,
            has_dog: dog,
            has_cat: cat,
            has_other_pet: false,
            blur_category: blur,
            center_category: CenterCategory::WellCentered,
        }
    }

    fn matrix(tp: usize, fp: usize, tn: usize, fn_: usize) -> ConfusionMatrix {
        ConfusionMatrix { tp, fp, tn, fn_ }
    }

    fn advice(person: ConfusionMatrix, cat: ConfusionMatrix) -> Vec<String> {
        let mut labels = LabelSet::new();
        labels.insert("a.jpg".into(), label(false, true, false, BlurCategory::Sharp));
        labels.insert("b.jpg".into(), label(true, false, false, BlurCategory::Sharp));
        let cmp = Comparison {
            person,
            cat,
            ..Comparison::default()
        };
        recommendations(&cmp, &labels)
    }

    fn has(lines: &[String], needle: &str) -> bool {
        lines.iter().any(|l| l.contains(needle))
    }

    #[test]
    fn recommendations_report_dog_share() {
        let lines = advice(matrix(1, 0, 1, 0), matrix(1, 0, 1, 0));
        assert!(has(&lines, "1 photos contain dogs (50.0%)"));
    }

    #[test]
    fn person_false_positives_beat_misses() {
        let lines = advice(matrix(1, 3, 0, 5), matrix(1, 0, 1, 0));
        assert!(has(&lines, "High false positive rate: 3 false vs 1 correct"));
        assert!(!has(&lines, "High miss rate"));
    }

    #[test]
    fn person_misses_flagged_when_fn_exceeds_tp() {
        let lines = advice(matrix(2, 1, 0, 3), matrix(1, 0, 1, 0));
        assert!(has(&lines, "High miss rate: missing 3 of 5 people"));
    }

    #[test]
    fn person_reasonable_otherwise() {
        let lines = advice(matrix(3, 1, 4, 2), matrix(1, 0, 1, 0));
        assert!(has(&lines, "Reasonable performance: 70.0% accuracy"));
    }

    #[test]
    fn cat_low_recall_checked_before_precision() {
        // recall 0.6, precision 0.5
        let lines = advice(matrix(1, 0, 1, 0), matrix(3, 3, 0, 2));
        assert!(has(&lines, "Missing cats: only 60.0% of cats detected"));
        assert!(!has(&lines, "cat detections are wrong"));
    }

    #[test]
    fn cat_low_precision_flagged() {
        // recall 1.0, precision 0.75
        let lines = advice(matrix(1, 0, 1, 0), matrix(3, 1, 0, 0));
        assert!(has(&lines, "False positives: 25.0% of cat detections are wrong"));
    }

    #[test]
    fn cat_good_performance() {
        let lines = advice(matrix(1, 0, 1, 0), matrix(4, 0, 2, 0));
        assert!(has(&lines, "Good performance: 100.0% F1 score"));
    }

    #[test]
    fn insights_cover_subjects_quality_and_single_subjects() {
        let mut labels = LabelSet::new();
        labels.insert("1.jpg".into(), label(false, true, false, BlurCategory::Sharp));
        labels.insert("2.jpg".into(), label(false, false, true, BlurCategory::Sharp));
        labels.insert("3.jpg".into(), label(true, false, true, BlurCategory::Blurry));
        labels.insert("4.jpg".into(), label(false, false, false, BlurCategory::Soft));
        let lines = insights(&label_stats(&labels));
        assert!(has(&lines, "Dog detection needed: 1 photos contain dogs"));
        assert!(has(&lines, "Cat detection can be validated: 2 photos"));
        assert!(has(&lines, "Person detection can be validated: 1 photos"));
        assert!(has(&lines, "50.0% sharp"));
        assert!(has(&lines, "25.0% blurry"));
        assert!(has(&lines, "1 dog-only photos"));
        assert!(has(&lines, "1 cat-only photos"));
        assert!(!has(&lines, "person-only"));
    }

    #[test]
    fn insights_skip_absent_subjects() {
        let mut labels = LabelSet::new();
        labels.insert("1.jpg".into(), label(false, false, false, BlurCategory::Soft));
        let lines = insights(&label_stats(&labels));
        assert!(!has(&lines, "Dog detection"));
        assert!(!has(&lines, "Cat detection"));
        assert!(!has(&lines, "Person detection"));
        assert!(has(&lines, "0.0% sharp"));
    }

    #[test]
    fn display_name_title_cases_words() {
        assert_eq!(display_name("somewhat_centered"), "Somewhat Centered");
        assert_eq!(display_name("sharp"), "Sharp");
    }

    #[test]
    fn mismatch_lines_truncate_after_limit() {
        let names: Vec<String> = (0..13).map(|i| format!("img{i}.jpg")).collect();
        let lines = mismatch_lines(&names, 10);
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "  • img0.jpg");
        assert_eq!(lines[10], "  ... and 3 more");
        assert_eq!(mismatch_lines(&names[..2], 10).len(), 2);
    }

    #[test]
    fn label_report_rules_are_narrower_than_comparison() {
        assert_eq!(rule(ProgressConsts::LABEL_RULE_WIDTH).len(), 60);
        assert_eq!(rule(ProgressConsts::REPORT_RULE_WIDTH).len(), 70);
    }

    #[test]
    fn pct_of_empty_total_is_zero() {
        assert_eq!(pct(3, 0), 0.0);
        assert_eq!(pct(1, 4), 25.0);
    }
}
