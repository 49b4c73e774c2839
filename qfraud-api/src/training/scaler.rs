//! Per-column standardization

use super::Matrix;
use ndarray::{Array1, Axis};

/// Zero mean / unit variance scaling fitted on one matrix
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations
    ///
    /// Constant columns get a scale of 1 so they map to 0.
    pub fn fit(x: &Matrix) -> Self {
        let n_features = x.ncols();
        if x.nrows() == 0 {
            return Self {
                mean: Array1::zeros(n_features),
                scale: Array1::ones(n_features),
            };
        }

        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std > f64::EPSILON * 10.0 { std } else { 1.0 });

        Self { mean, scale }
    }

    pub fn transform(&self, x: &Matrix) -> Matrix {
        (x - &self.mean) / &self.scale
    }

    pub fn fit_transform(x: &Matrix) -> Matrix {
        Self::fit(x).transform(x)
    }
}
