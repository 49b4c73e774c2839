//! Principal component projection
//!
//! Eigen-decomposes the sample covariance matrix with `linfa-linalg`'s
//! symmetric solver and keeps the leading eigenvectors. The feature count is
//! small (30), so building the covariance matrix dominates the cost.

use super::{Matrix, TrainingError};
use linfa_linalg::eigh::Eigh;
use ndarray::{Array1, ArrayViewMut1, Axis};

/// A fitted projection onto the leading principal components
#[derive(Debug, Clone, PartialEq)]
pub struct Pca {
    mean: Array1<f64>,
    /// One row per component, unit length
    components: Matrix,
    explained_variance_ratio: Vec<f64>,
}

impl Pca {
    /// Fit `n_components` components to the rows of `x`
    pub fn fit(x: &Matrix, n_components: usize) -> Result<Self, TrainingError> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(TrainingError::InsufficientData(
                "cannot fit principal components to an empty matrix".to_string(),
            ));
        }
        if n_components == 0 || n_components > n_features.min(n_samples) {
            return Err(TrainingError::Pipeline(format!(
                "n_components={} must be between 1 and min(n_samples, n_features)={}",
                n_components,
                n_features.min(n_samples)
            )));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| TrainingError::Pipeline("empty matrix".to_string()))?;
        let centered = x - &mean;
        let denominator = (n_samples.max(2) - 1) as f64;
        let covariance = centered.t().dot(&centered) / denominator;

        let (eigenvalues, eigenvectors) = covariance
            .eigh()
            .map_err(|e| TrainingError::Pipeline(format!("eigen decomposition failed: {}", e)))?;

        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));
        order.truncate(n_components);

        // eigenvectors are columns; store components as rows
        let mut components = eigenvectors.select(Axis(1), &order).reversed_axes();
        for component in components.rows_mut() {
            flip_sign(component);
        }

        let total_variance: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
        let explained_variance_ratio = order
            .iter()
            .map(|&k| {
                if total_variance > 0.0 {
                    eigenvalues[k].max(0.0) / total_variance
                } else {
                    0.0
                }
            })
            .collect();

        Ok(Self {
            mean,
            components,
            explained_variance_ratio,
        })
    }

    pub fn transform(&self, x: &Matrix) -> Matrix {
        (x - &self.mean).dot(&self.components.t())
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }
}

/// Make the largest-magnitude loading positive
fn flip_sign(mut component: ArrayViewMut1<'_, f64>) {
    let pivot = component
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        component.mapv_inplace(|c| -c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_components_of_known_covariance() {
        // covariance [[2.4, 1.6], [1.6, 2.4]] has eigenvalues 4.0 and 0.8
        let x = array![[1.0, 1.0], [-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [2.0, 2.0], [-2.0, -2.0]];
        let pca = Pca::fit(&x, 2).unwrap();

        let ratios = pca.explained_variance_ratio();
        assert!((ratios[0] - 5.0 / 6.0).abs() < 1e-10, "{:?}", ratios);
        assert!((ratios[1] - 1.0 / 6.0).abs() < 1e-10);

        // leading axis is the diagonal, sign fixed positive
        let lead = pca.components.row(0);
        let half = 0.5f64.sqrt();
        assert!((lead[0] - half).abs() < 1e-10);
        assert!((lead[1] - half).abs() < 1e-10);

        // rows are orthonormal
        let gram = pca.components.dot(&pca.components.t());
        for ((i, j), value) in gram.indexed_iter() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((value - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn test_first_component_follows_main_axis() {
        // points along y = 2x with a little noise on the orthogonal axis
        let x = Matrix::from_shape_fn((20, 2), |(i, j)| {
            let t = i as f64 - 10.0;
            let noise = if i % 2 == 0 { 0.05 } else { -0.05 };
            if j == 0 {
                t - 2.0 * noise
            } else {
                2.0 * t + noise
            }
        });

        let pca = Pca::fit(&x, 2).unwrap();
        let ratios = pca.explained_variance_ratio();
        assert!(ratios[0] > 0.99);
        assert!((ratios[0] + ratios[1] - 1.0).abs() < 1e-9);

        let component = pca.components.row(0);
        let norm = 5f64.sqrt();
        assert!((component[0] - 1.0 / norm).abs() < 1e-3);
        assert!((component[1] - 2.0 / norm).abs() < 1e-3);

        let projected = pca.transform(&x);
        assert_eq!(projected.dim(), (20, 2));
        assert_eq!(pca.n_components(), 2);
    }

    #[test]
    fn test_rejects_too_many_components() {
        let x = array![[1.0, 2.0, 3.0]];
        assert!(Pca::fit(&x, 2).is_err());
        assert!(Pca::fit(&Matrix::zeros((0, 3)), 1).is_err());
    }
}
