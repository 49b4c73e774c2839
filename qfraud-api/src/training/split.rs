//! Stratified train/test split

use super::dataset::class_counts;
use super::TrainingError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Share of rows held out for evaluation
pub const TEST_FRACTION: f64 = 0.2;

/// Row indices of the train and test partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so each label keeps its share in both partitions
///
/// The test partition holds `ceil(test_fraction * n)` rows, spread over the
/// labels by largest remainder. Every label needs at least two members.
pub fn stratified_split(
    labels: &[i64],
    test_fraction: f64,
    rng: &mut StdRng,
) -> Result<SplitIndices, TrainingError> {
    let n = labels.len();
    let counts = class_counts(labels);

    if let Some((label, _)) = counts.iter().find(|(_, &count)| count < 2) {
        return Err(TrainingError::InsufficientData(format!(
            "label {} has fewer than 2 rows; cannot stratify the train/test split",
            label
        )));
    }

    let n_test = (test_fraction * n as f64).ceil() as usize;
    let n_train = n - n_test.min(n);
    if n_test < counts.len() || n_train < counts.len() {
        return Err(TrainingError::InsufficientData(format!(
            "{} rows cannot be split into train and test sets covering all {} labels",
            n,
            counts.len()
        )));
    }

    let allocation = allocate_test_counts(&counts.values().copied().collect::<Vec<_>>(), n_test);

    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for ((&label, _), take) in counts.iter().zip(allocation) {
        let mut members: Vec<usize> = (0..n).filter(|&i| labels[i] == label).collect();
        members.shuffle(rng);
        test.extend_from_slice(&members[..take]);
        train.extend_from_slice(&members[take..]);
    }

    train.shuffle(rng);
    test.shuffle(rng);

    Ok(SplitIndices { train, test })
}

/// Largest-remainder apportionment of `total` test rows over class sizes
fn allocate_test_counts(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let ideal: Vec<f64> = counts
        .iter()
        .map(|&c| total as f64 * c as f64 / n as f64)
        .collect();

    let mut allocation: Vec<usize> = ideal.iter().map(|v| v.floor() as usize).collect();
    let mut remaining = total.saturating_sub(allocation.iter().sum());

    let mut by_remainder: Vec<usize> = (0..counts.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = ideal[a] - ideal[a].floor();
        let rb = ideal[b] - ideal[b].floor();
        rb.total_cmp(&ra).then(counts[b].cmp(&counts[a])).then(a.cmp(&b))
    });

    for &i in by_remainder.iter().cycle().take(counts.len() * 2) {
        if remaining == 0 {
            break;
        }
        // Keep at least one member of every class for training
        if allocation[i] + 1 < counts[i] {
            allocation[i] += 1;
            remaining -= 1;
        }
    }

    allocation
}
