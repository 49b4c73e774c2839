//! State-vector simulation of the variational classifier circuit
//!
//! Layout on `n` wires (wire 0 is the most significant bit of the basis
//! index):
//!
//! ```text
//! RY(x_i) on wire i            angle embedding of the features
//! Rot(φ_i, θ_i, ω_i) on wire i trainable, Rot = RZ(ω)·RY(θ)·RZ(φ)
//! CNOT(i, i+1) for i < n-1     entangling chain
//! measure ⟨Z⟩ on wire 0
//! ```
//!
//! The class-1 probability is `(⟨Z⟩ + 1) / 2`. Every trainable angle enters
//! through a single Pauli rotation, so exact gradients come from the
//! parameter-shift rule: `∂⟨Z⟩/∂w = (f(w + π/2) − f(w − π/2)) / 2`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, PI};

/// Lower/upper clip applied to probabilities inside the loss
pub const PROBABILITY_CLIP: f64 = 1e-6;

/// Trainable angles per wire (φ, θ, ω)
pub const ANGLES_PER_WIRE: usize = 3;

/// Trainable angles, one row `[φ, θ, ω]` per wire
pub type Weights = Array2<f64>;

type Gate = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

fn ry(theta: f64) -> Gate {
    let (s, c) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
        [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
    ]
}

fn rz(phi: f64) -> Gate {
    [
        [Complex64::from_polar(1.0, -phi / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, phi / 2.0)],
    ]
}

struct StateVector {
    n_wires: usize,
    amplitudes: Array1<Complex64>,
}

impl StateVector {
    fn zero(n_wires: usize) -> Self {
        let mut amplitudes = Array1::from_elem(1 << n_wires, ZERO);
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            n_wires,
            amplitudes,
        }
    }

    fn mask(&self, wire: usize) -> usize {
        1 << (self.n_wires - 1 - wire)
    }

    fn apply(&mut self, gate: &Gate, wire: usize) {
        let mask = self.mask(wire);
        for i in 0..self.amplitudes.len() {
            if i & mask != 0 {
                continue;
            }
            let j = i | mask;
            let (a, b) = (self.amplitudes[i], self.amplitudes[j]);
            self.amplitudes[i] = gate[0][0] * a + gate[0][1] * b;
            self.amplitudes[j] = gate[1][0] * a + gate[1][1] * b;
        }
    }

    fn cnot(&mut self, control: usize, target: usize) {
        let control_mask = self.mask(control);
        let target_mask = self.mask(target);
        for i in 0..self.amplitudes.len() {
            if i & control_mask != 0 && i & target_mask == 0 {
                self.amplitudes.swap(i, i | target_mask);
            }
        }
    }

    fn expectation_z(&self, wire: usize) -> f64 {
        let mask = self.mask(wire);
        self.amplitudes
            .indexed_iter()
            .map(|(i, amp)| {
                let sign = if i & mask == 0 { 1.0 } else { -1.0 };
                sign * amp.norm_sqr()
            })
            .sum()
    }
}

/// ⟨Z₀⟩ of the circuit for one feature vector
///
/// `x` needs one entry per wire, `weights` one row per wire.
pub fn expectation(x: ArrayView1<'_, f64>, weights: &Weights) -> f64 {
    let n_wires = weights.nrows();
    let mut state = StateVector::zero(n_wires);

    for (wire, &angle) in x.iter().enumerate().take(n_wires) {
        state.apply(&ry(angle), wire);
    }
    for (wire, angles) in weights.rows().into_iter().enumerate() {
        state.apply(&rz(angles[0]), wire);
        state.apply(&ry(angles[1]), wire);
        state.apply(&rz(angles[2]), wire);
    }
    for wire in 0..n_wires.saturating_sub(1) {
        state.cnot(wire, wire + 1);
    }

    state.expectation_z(0)
}

/// Class-1 probability in `[0, 1]`
pub fn probability(x: ArrayView1<'_, f64>, weights: &Weights) -> f64 {
    (expectation(x, weights) + 1.0) / 2.0
}

/// Trainable circuit classifier
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitClassifier {
    weights: Weights,
}

impl CircuitClassifier {
    /// Weights drawn from a standard normal distribution
    pub fn random(n_wires: usize, rng: &mut StdRng) -> Self {
        let weights =
            Weights::from_shape_simple_fn((n_wires, ANGLES_PER_WIRE), || standard_normal(rng));
        Self { weights }
    }

    #[cfg(test)]
    fn with_weights(weights: Weights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn predict_proba(&self, x: ArrayView1<'_, f64>) -> f64 {
        probability(x, &self.weights)
    }

    /// Class-1 probability for every row of `xs`
    pub fn predict_proba_rows(&self, xs: ArrayView2<'_, f64>) -> Vec<f64> {
        xs.rows().into_iter().map(|x| self.predict_proba(x)).collect()
    }

    /// Mean clipped binary cross-entropy over a batch
    pub fn loss(&self, xs: ArrayView2<'_, f64>, ys: &[f64]) -> f64 {
        let total: f64 = xs
            .rows()
            .into_iter()
            .zip(ys)
            .map(|(x, &y)| {
                let p = clip(self.predict_proba(x));
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .sum();
        total / xs.nrows().max(1) as f64
    }

    /// Loss and its gradient at the current weights
    ///
    /// Samples whose probability is clipped contribute no gradient.
    pub fn loss_and_gradient(&self, xs: ArrayView2<'_, f64>, ys: &[f64]) -> (f64, Weights) {
        let n = xs.nrows().max(1) as f64;
        let mut loss = 0.0;
        let mut gradient = Weights::zeros(self.weights.raw_dim());

        for (x, &y) in xs.rows().into_iter().zip(ys) {
            let raw = self.predict_proba(x);
            let p = clip(raw);
            loss -= y * p.ln() + (1.0 - y) * (1.0 - p).ln();

            if raw <= PROBABILITY_CLIP || raw >= 1.0 - PROBABILITY_CLIP {
                continue;
            }

            let dloss_dp = -y / p + (1.0 - y) / (1.0 - p);
            let mut shifted = self.weights.clone();
            for ((wire, k), grad) in gradient.indexed_iter_mut() {
                let original = shifted[[wire, k]];
                shifted[[wire, k]] = original + FRAC_PI_2;
                let plus = expectation(x, &shifted);
                shifted[[wire, k]] = original - FRAC_PI_2;
                let minus = expectation(x, &shifted);
                shifted[[wire, k]] = original;

                // dp/dw = ½ · d⟨Z⟩/dw
                let dp_dw = 0.5 * (plus - minus) / 2.0;
                *grad += dloss_dp * dp_dw / n;
            }
        }

        (loss / n, gradient)
    }

    /// One gradient descent step; returns the loss before the step
    pub fn step(&mut self, xs: ArrayView2<'_, f64>, ys: &[f64], learning_rate: f64) -> f64 {
        let (loss, gradient) = self.loss_and_gradient(xs, ys);
        Zip::from(&mut self.weights)
            .and(&gradient)
            .for_each(|w, &g| *w -= learning_rate * g);
        loss
    }
}

fn clip(p: f64) -> f64 {
    p.clamp(PROBABILITY_CLIP, 1.0 - PROBABILITY_CLIP)
}

/// Box-Muller transform
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
