//! Gradient clipping and RMSProp.

use throng_core::ModelConfig;

use crate::params::Params;

/// Scale `grads` so its global L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_by_global_norm(grads: &mut Params, max_norm: f64) -> f64 {
    let norm = grads.squared_norm().sqrt();
    if norm > max_norm && norm > 0.0 {
        grads.scale(max_norm / norm);
    }
    norm
}

/// RMSProp with per-parameter running mean of squared gradients:
///
/// ```text
/// ms = decay·ms + (1 - decay)·g²
/// w -= lr·g / sqrt(ms + ε)
/// ```
///
/// Running averages start at 1.0.
#[derive(Clone, Debug)]
pub struct RmsProp {
    decay: f64,
    epsilon: f64,
    mean_square: Params,
}

impl RmsProp {
    /// Fresh optimizer state for a model of shape `config`.
    pub fn new(config: &ModelConfig, decay: f64, epsilon: f64) -> Self {
        Self {
            decay,
            epsilon,
            mean_square: Params::filled(config, 1.0),
        }
    }

    /// Apply one update with learning rate `lr`.
    pub fn step(&mut self, params: &mut Params, grads: &Params, lr: f64) {
        let decay = self.decay;
        let eps = self.epsilon;
        for ((w, ms), g) in params
            .tensors_mut()
            .into_iter()
            .zip(self.mean_square.tensors_mut())
            .zip(grads.tensors())
        {
            for ((wv, mv), &gv) in w.iter_mut().zip(ms.iter_mut()).zip(g) {
                *mv = decay * *mv + (1.0 - decay) * gv * gv;
                *wv -= lr * gv / (*mv + eps).sqrt();
            }
        }
    }
}
