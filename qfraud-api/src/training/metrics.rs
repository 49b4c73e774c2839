//! Binary classification metrics
//!
//! Label 1 is the positive (fraud) class throughout.

use qfraud_common::events::{ClassMetrics, ClassificationReport, RocCurve};
use std::collections::{BTreeMap, BTreeSet};

/// Positive class label
pub const POSITIVE_LABEL: i64 = 1;

/// Decision threshold on the class-1 probability (strictly greater)
pub const DECISION_THRESHOLD: f64 = 0.5;

pub fn predict_labels(probabilities: &[f64]) -> Vec<i64> {
    probabilities
        .iter()
        .map(|&p| if p > DECISION_THRESHOLD { POSITIVE_LABEL } else { 0 })
        .collect()
}

pub fn accuracy(y_true: &[i64], y_pred: &[i64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// F1 score of the positive class; 0 when precision and recall are undefined
pub fn f1_score(y_true: &[i64], y_pred: &[i64]) -> f64 {
    label_metrics(y_true, y_pred, POSITIVE_LABEL).f1_score
}

/// True when both classes appear in `y_true`
pub fn has_both_classes(y_true: &[i64]) -> bool {
    let positives = y_true.iter().filter(|&&y| y == POSITIVE_LABEL).count();
    positives > 0 && positives < y_true.len()
}

/// Area under the ROC curve
///
/// Computed as the Mann-Whitney U statistic with tied scores sharing their
/// average rank. A single-class `y_true` yields 0.5.
pub fn roc_auc(y_true: &[i64], scores: &[f64]) -> f64 {
    if !has_both_classes(y_true) {
        return 0.5;
    }

    let ranks = average_ranks(scores);
    let n_pos = y_true.iter().filter(|&&y| y == POSITIVE_LABEL).count() as f64;
    let n_neg = y_true.len() as f64 - n_pos;
    let positive_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y == POSITIVE_LABEL)
        .map(|(_, r)| r)
        .sum();

    (positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}

/// 1-based ranks, ties get the mean of the ranks they span
fn average_ranks(scores: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// ROC curve points, one per distinct score threshold
///
/// Collinear intermediate points are dropped and `(0, 0)` is prepended. A
/// single-class `y_true` yields the diagonal `[0, 1] / [0, 1]`.
pub fn roc_curve(y_true: &[i64], scores: &[f64]) -> RocCurve {
    if !has_both_classes(y_true) {
        return RocCurve {
            fpr: vec![0.0, 1.0],
            tpr: vec![0.0, 1.0],
        };
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    // Cumulative counts at the last index of each distinct score
    let mut tps = Vec::new();
    let mut fps = Vec::new();
    let (mut tp, mut fp) = (0.0, 0.0);
    for (position, &i) in order.iter().enumerate() {
        if y_true[i] == POSITIVE_LABEL {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let is_last_of_score = order
            .get(position + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if is_last_of_score {
            tps.push(tp);
            fps.push(fp);
        }
    }

    let keep: Vec<usize> = (0..tps.len())
        .filter(|&k| {
            k == 0
                || k == tps.len() - 1
                || fps[k + 1] - 2.0 * fps[k] + fps[k - 1] != 0.0
                || tps[k + 1] - 2.0 * tps[k] + tps[k - 1] != 0.0
        })
        .collect();

    let (total_tp, total_fp) = (tp, fp);
    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    for k in keep {
        fpr.push(fps[k] / total_fp);
        tpr.push(tps[k] / total_tp);
    }

    RocCurve { fpr, tpr }
}

/// Keep every `step`-th point, starting with the first
pub fn downsample(curve: &RocCurve, step: usize) -> RocCurve {
    let pick = |values: &[f64]| values.iter().step_by(step.max(1)).copied().collect();
    RocCurve {
        fpr: pick(&curve.fpr),
        tpr: pick(&curve.tpr),
    }
}

/// Sorted union of the labels in both vectors
pub fn labels_of(y_true: &[i64], y_pred: &[i64]) -> Vec<i64> {
    y_true
        .iter()
        .chain(y_pred)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows are true labels, columns predicted labels, both in `labels_of` order
pub fn confusion_matrix(y_true: &[i64], y_pred: &[i64]) -> Vec<Vec<u64>> {
    let labels = labels_of(y_true, y_pred);
    let index: BTreeMap<i64, usize> = labels.iter().enumerate().map(|(i, &l)| (l, i)).collect();

    let mut matrix = vec![vec![0u64; labels.len()]; labels.len()];
    for (t, p) in y_true.iter().zip(y_pred) {
        matrix[index[t]][index[p]] += 1;
    }
    matrix
}

fn label_metrics(y_true: &[i64], y_pred: &[i64], label: i64) -> ClassMetrics {
    let (mut tp, mut fp, mut fn_) = (0u64, 0u64, 0u64);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == label, p == label) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassMetrics {
        precision,
        recall,
        f1_score,
        support: (tp + fn_) as f64,
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Per-label precision/recall/F1/support plus accuracy and averages
pub fn classification_report(y_true: &[i64], y_pred: &[i64]) -> ClassificationReport {
    let labels = labels_of(y_true, y_pred);
    let per_label: Vec<ClassMetrics> = labels
        .iter()
        .map(|&label| label_metrics(y_true, y_pred, label))
        .collect();

    let n_labels = per_label.len().max(1) as f64;
    let total_support: f64 = per_label.iter().map(|m| m.support).sum();

    let average = |weight: &dyn Fn(&ClassMetrics) -> f64, denominator: f64| {
        let mean = |field: fn(&ClassMetrics) -> f64| {
            if denominator > 0.0 {
                per_label.iter().map(|m| field(m) * weight(m)).sum::<f64>() / denominator
            } else {
                0.0
            }
        };
        ClassMetrics {
            precision: mean(|m: &ClassMetrics| m.precision),
            recall: mean(|m: &ClassMetrics| m.recall),
            f1_score: mean(|m: &ClassMetrics| m.f1_score),
            support: total_support,
        }
    };

    let macro_avg = average(&|_: &ClassMetrics| 1.0, n_labels);
    let weighted_avg = average(&|m: &ClassMetrics| m.support, total_support);

    ClassificationReport {
        classes: labels
            .iter()
            .map(|label| label.to_string())
            .zip(per_label.iter().cloned())
            .collect(),
        accuracy: accuracy(y_true, y_pred),
        macro_avg,
        weighted_avg,
    }
}
