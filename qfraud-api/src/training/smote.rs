//! Synthetic minority oversampling
//!
//! Every class smaller than the majority class is grown to the majority
//! count. A synthetic sample sits on the segment between a random class
//! member and one of its k nearest same-class neighbours.

use super::dataset::{class_counts, Dataset};
use super::Matrix;
use ndarray::{Array1, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::Rng;

/// Neighbours considered per sample
pub const DEFAULT_K_NEIGHBORS: usize = 5;

/// Oversample `dataset` so that all classes have the majority count
///
/// Originals come first, in their original order, followed by the
/// synthetic samples grouped by label.
pub fn oversample(dataset: &Dataset, k_neighbors: usize, rng: &mut StdRng) -> Dataset {
    let counts = class_counts(&dataset.labels);
    let Some(&majority) = counts.values().max() else {
        return dataset.clone();
    };

    let mut synthetic: Vec<Array1<f64>> = Vec::new();
    let mut labels = dataset.labels.clone();

    for (&label, &count) in &counts {
        if count >= majority {
            continue;
        }
        let needed = majority - count;
        let members: Vec<ArrayView1<'_, f64>> = dataset
            .features
            .axis_iter(Axis(0))
            .zip(&dataset.labels)
            .filter(|&(_, &l)| l == label)
            .map(|(x, _)| x)
            .collect();

        if members.len() == 1 {
            // No neighbour to interpolate toward
            synthetic.extend((0..needed).map(|_| members[0].to_owned()));
            labels.extend(std::iter::repeat(label).take(needed));
            continue;
        }

        let k = k_neighbors.min(members.len() - 1).max(1);
        let neighbours = nearest_neighbours(&members, k);

        for _ in 0..needed {
            let i = rng.gen_range(0..members.len());
            let j = neighbours[i][rng.gen_range(0..k)];
            let gap: f64 = rng.gen();

            let mut sample = members[i].to_owned();
            sample.scaled_add(gap, &(&members[j] - &members[i]));
            synthetic.push(sample);
            labels.push(label);
        }
    }

    let n_original = dataset.len();
    let features = Matrix::from_shape_fn(
        (n_original + synthetic.len(), dataset.n_features()),
        |(i, j)| {
            if i < n_original {
                dataset.features[[i, j]]
            } else {
                synthetic[i - n_original][j]
            }
        },
    );

    Dataset { features, labels }
}

/// Indices of the `k` nearest other members of each member
fn nearest_neighbours(members: &[ArrayView1<'_, f64>], k: usize) -> Vec<Vec<usize>> {
    members
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let mut distances: Vec<(f64, usize)> = members
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, y)| (squared_distance(x, y), j))
                .collect();
            distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            distances.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    let diff = a - b;
    diff.dot(&diff)
}
