//! Trainable weights.
//!
//! Eight flat row-major tensors. The same struct doubles as a gradient
//! buffer ([`Params::zeros_like`]) and as the optimizer's running
//! averages ([`Params::filled`]).
//!
//! | name       | shape            | init                       |
//! |------------|------------------|----------------------------|
//! | `coord_w`  | `[2, E]`         | truncated normal, σ = 0.1  |
//! | `coord_b`  | `[E]`            | 0.1                        |
//! | `tensor_w` | `[G²·H, E]`      | truncated normal, σ = 0.1  |
//! | `tensor_b` | `[E]`            | 0.1                        |
//! | `lstm_w`   | `[2E + H, 4H]`   | Glorot uniform             |
//! | `lstm_b`   | `[4H]`           | 0                          |
//! | `out_w`    | `[H, 5]`         | truncated normal, σ = 0.1  |
//! | `out_b`    | `[5]`            | 0.1                        |

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use throng_core::{ModelConfig, OUTPUT_SIZE};

use crate::error::ModelError;

/// Tensor names in storage order.
pub const PARAM_NAMES: [&str; 8] = [
    "coord_w", "coord_b", "tensor_w", "tensor_b", "lstm_w", "lstm_b", "out_w", "out_b",
];

const INIT_STDDEV: f64 = 0.1;
const INIT_BIAS: f64 = 0.1;

/// All trainable tensors of the model.
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    /// Position embedding weights `[2, E]`.
    pub coord_w: Vec<f64>,
    /// Position embedding bias `[E]`.
    pub coord_b: Vec<f64>,
    /// Social tensor embedding weights `[G²·H, E]`.
    pub tensor_w: Vec<f64>,
    /// Social tensor embedding bias `[E]`.
    pub tensor_b: Vec<f64>,
    /// LSTM kernel `[2E + H, 4H]`, gate columns ordered `i, j, f, o`.
    pub lstm_w: Vec<f64>,
    /// LSTM bias `[4H]`.
    pub lstm_b: Vec<f64>,
    /// Output projection `[H, 5]`.
    pub out_w: Vec<f64>,
    /// Output bias `[5]`.
    pub out_b: Vec<f64>,
}

impl Params {
    /// Tensor lengths in [`PARAM_NAMES`] order.
    pub fn lengths(config: &ModelConfig) -> [usize; 8] {
        let e = config.embedding_size;
        let h = config.rnn_size;
        [
            2 * e,
            e,
            config.social_size() * e,
            e,
            (2 * e + h) * 4 * h,
            4 * h,
            h * OUTPUT_SIZE,
            OUTPUT_SIZE,
        ]
    }

    /// Seeded initialisation.
    pub fn init(config: &ModelConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let [coord_w, coord_b, tensor_w, tensor_b, lstm_w, lstm_b, out_w, out_b] =
            Self::lengths(config);

        let fan_in = 2 * config.embedding_size + config.rnn_size;
        let fan_out = 4 * config.rnn_size;
        let glorot = (6.0 / (fan_in + fan_out) as f64).sqrt();

        Self {
            coord_w: truncated_normal(&mut rng, coord_w),
            coord_b: vec![INIT_BIAS; coord_b],
            tensor_w: truncated_normal(&mut rng, tensor_w),
            tensor_b: vec![INIT_BIAS; tensor_b],
            lstm_w: (0..lstm_w)
                .map(|_| (rng.random::<f64>() * 2.0 - 1.0) * glorot)
                .collect(),
            lstm_b: vec![0.0; lstm_b],
            out_w: truncated_normal(&mut rng, out_w),
            out_b: vec![INIT_BIAS; out_b],
        }
    }

    /// Every tensor filled with `value`.
    pub fn filled(config: &ModelConfig, value: f64) -> Self {
        let [a, b, c, d, e, f, g, h] = Self::lengths(config);
        Self {
            coord_w: vec![value; a],
            coord_b: vec![value; b],
            tensor_w: vec![value; c],
            tensor_b: vec![value; d],
            lstm_w: vec![value; e],
            lstm_b: vec![value; f],
            out_w: vec![value; g],
            out_b: vec![value; h],
        }
    }

    /// Zero-filled shadow for gradient accumulation.
    pub fn zeros_like(config: &ModelConfig) -> Self {
        Self::filled(config, 0.0)
    }

    /// Rebuild from tensors in [`PARAM_NAMES`] order, checking lengths.
    ///
    /// # Errors
    ///
    /// [`ModelError::TensorCount`] or [`ModelError::ParamLength`].
    pub fn from_tensors(config: &ModelConfig, tensors: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        let lengths = Self::lengths(config);
        if tensors.len() != lengths.len() {
            return Err(ModelError::TensorCount {
                expected: lengths.len(),
                found: tensors.len(),
            });
        }
        for ((name, expected), t) in PARAM_NAMES.iter().zip(lengths).zip(&tensors) {
            if t.len() != expected {
                return Err(ModelError::ParamLength {
                    name: *name,
                    expected,
                    found: t.len(),
                });
            }
        }
        let mut it = tensors.into_iter();
        let mut next = || it.next().unwrap_or_default();
        Ok(Self {
            coord_w: next(),
            coord_b: next(),
            tensor_w: next(),
            tensor_b: next(),
            lstm_w: next(),
            lstm_b: next(),
            out_w: next(),
            out_b: next(),
        })
    }

    /// Check every tensor against the lengths `config` implies.
    ///
    /// # Errors
    ///
    /// [`ModelError::ParamLength`] naming the first mismatch.
    pub fn check_shapes(&self, config: &ModelConfig) -> Result<(), ModelError> {
        for ((name, expected), t) in PARAM_NAMES
            .iter()
            .zip(Self::lengths(config))
            .zip(self.tensors())
        {
            if t.len() != expected {
                return Err(ModelError::ParamLength {
                    name: *name,
                    expected,
                    found: t.len(),
                });
            }
        }
        Ok(())
    }

    /// Tensors in [`PARAM_NAMES`] order.
    pub fn tensors(&self) -> [&[f64]; 8] {
        [
            &self.coord_w,
            &self.coord_b,
            &self.tensor_w,
            &self.tensor_b,
            &self.lstm_w,
            &self.lstm_b,
            &self.out_w,
            &self.out_b,
        ]
    }

    /// Mutable tensors in [`PARAM_NAMES`] order.
    pub fn tensors_mut(&mut self) -> [&mut [f64]; 8] {
        [
            self.coord_w.as_mut_slice(),
            self.coord_b.as_mut_slice(),
            self.tensor_w.as_mut_slice(),
            self.tensor_b.as_mut_slice(),
            self.lstm_w.as_mut_slice(),
            self.lstm_b.as_mut_slice(),
            self.out_w.as_mut_slice(),
            self.out_b.as_mut_slice(),
        ]
    }

    /// Total number of scalars.
    pub fn num_params(&self) -> usize {
        self.tensors().iter().map(|t| t.len()).sum()
    }

    /// `Σ w²` over every tensor.
    pub fn squared_norm(&self) -> f64 {
        self.tensors()
            .iter()
            .flat_map(|t| t.iter())
            .map(|w| w * w)
            .sum()
    }

    /// Whether every value is finite.
    pub fn is_finite(&self) -> bool {
        self.tensors().iter().all(|t| t.iter().all(|w| w.is_finite()))
    }

    /// `self += other`, tensor by tensor.
    pub fn add_assign(&mut self, other: &Params) {
        for (dst, src) in self.tensors_mut().into_iter().zip(other.tensors()) {
            crate::linalg::add_assign(dst, src);
        }
    }

    /// `self *= factor`.
    pub fn scale(&mut self, factor: f64) {
        for t in self.tensors_mut() {
            t.iter_mut().for_each(|v| *v *= factor);
        }
    }

    /// Add the gradient of `λ · Σ w²` taken at `weights`, i.e. `2λw`.
    pub fn add_l2_grad(&mut self, weights: &Params, l2_param: f64) {
        for (g, w) in self.tensors_mut().into_iter().zip(weights.tensors()) {
            for (gv, &wv) in g.iter_mut().zip(w) {
                *gv += 2.0 * l2_param * wv;
            }
        }
    }
}

/// Normal samples with stddev [`INIT_STDDEV`], redrawn beyond two stddevs.
fn truncated_normal(rng: &mut ChaCha8Rng, len: usize) -> Vec<f64> {
    (0..len)
        .map(|_| loop {
            let z = crate::density::standard_normal(rng);
            if z.abs() <= 2.0 {
                break z * INIT_STDDEV;
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> ModelConfig {
        ModelConfig {
            rnn_size: 4,
            embedding_size: 3,
            grid_size: 2,
            max_num_peds: 5,
            neighborhood_size: 1.0,
            l2_param: 0.01,
        }
    }

    #[test]
    fn shapes_follow_config() {
        let p = Params::init(&tiny(), 1);
        assert_eq!(p.coord_w.len(), 6);
        assert_eq!(p.tensor_w.len(), 4 * 4 * 3);
        assert_eq!(p.lstm_w.len(), (6 + 4) * 16);
        assert_eq!(p.out_w.len(), 20);
        assert_eq!(p.num_params(), Params::lengths(&tiny()).iter().sum::<usize>());
        assert!(p.check_shapes(&tiny()).is_ok());
    }

    #[test]
    fn init_is_deterministic_and_bounded() {
        let a = Params::init(&tiny(), 7);
        let b = Params::init(&tiny(), 7);
        let c = Params::init(&tiny(), 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.coord_w.iter().all(|w| w.abs() <= 0.2));
        assert!(a.out_b.iter().all(|&b| b == 0.1));
        assert!(a.lstm_b.iter().all(|&b| b == 0.0));
        let limit = (6.0f64 / (10 + 16) as f64).sqrt();
        assert!(a.lstm_w.iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn from_tensors_rejects_bad_lengths() {
        let p = Params::init(&tiny(), 1);
        let mut tensors: Vec<Vec<f64>> = p.tensors().iter().map(|t| t.to_vec()).collect();
        assert_eq!(Params::from_tensors(&tiny(), tensors.clone()).unwrap(), p);

        tensors[4].pop();
        assert!(matches!(
            Params::from_tensors(&tiny(), tensors.clone()),
            Err(ModelError::ParamLength { name: "lstm_w", .. })
        ));
        tensors.pop();
        assert!(matches!(
            Params::from_tensors(&tiny(), tensors),
            Err(ModelError::TensorCount { expected: 8, found: 7 })
        ));
    }

    #[test]
    fn l2_grad_is_twice_lambda_w() {
        let cfg = tiny();
        let p = Params::filled(&cfg, 3.0);
        let mut g = Params::zeros_like(&cfg);
        g.add_l2_grad(&p, 0.5);
        assert!(g.tensors().iter().all(|t| t.iter().all(|&v| v == 3.0)));
        assert_eq!(p.squared_norm(), 9.0 * p.num_params() as f64);
    }
}
