//! Training and sampling configuration.

use throng_core::ConfigError;
use throng_data::LoaderConfig;

// ── TrainConfig ─────────────────────────────────────────────────

/// Settings for [`Trainer`](crate::trainer::Trainer).
#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    /// Number of passes over the training windows. Default: 50.
    pub epochs: u32,
    /// Sequences per batch. Default: 16.
    pub batch_size: usize,
    /// Frames per input sequence. Default: 12.
    pub seq_length: usize,
    /// Learning rate at epoch 0. Default: 0.005.
    pub learning_rate: f64,
    /// Per-epoch multiplicative decay: epoch `e` uses
    /// `learning_rate · decay_rate^e`. Default: 0.95.
    pub decay_rate: f64,
    /// Global gradient norm ceiling. Default: 10.
    pub grad_clip: f64,
    /// RMSProp decay of the squared-gradient average. Default: 0.9.
    pub rms_decay: f64,
    /// RMSProp denominator epsilon. Default: 1e-10.
    pub rms_epsilon: f64,
    /// Write a checkpoint every this many epochs; the last epoch is
    /// always saved. Default: 1.
    pub save_every: u32,
    /// Seed for weight initialisation and the training shuffle.
    /// Default: 0.
    pub seed: u64,
    /// Gradient worker threads. `None` = auto-detect
    /// (`available_parallelism`, clamped to `[1, 16]`).
    pub worker_count: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 16,
            seq_length: 12,
            learning_rate: 0.005,
            decay_rate: 0.95,
            grad_clip: 10.0,
            rms_decay: 0.9,
            rms_epsilon: 1e-10,
            save_every: 1,
            seed: 0,
            worker_count: None,
        }
    }
}

impl TrainConfig {
    /// Validate all settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::ZeroSize { name: "epochs" });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroSize { name: "batch_size" });
        }
        if self.seq_length == 0 {
            return Err(ConfigError::ZeroSize { name: "seq_length" });
        }
        if self.save_every == 0 {
            return Err(ConfigError::ZeroSize { name: "save_every" });
        }
        positive("learning_rate", self.learning_rate)?;
        positive("grad_clip", self.grad_clip)?;
        positive("rms_epsilon", self.rms_epsilon)?;
        if !(self.decay_rate > 0.0 && self.decay_rate <= 1.0) {
            return Err(ConfigError::InvalidValue {
                name: "decay_rate",
                value: self.decay_rate,
                expected: "in (0, 1]",
            });
        }
        if !(0.0..1.0).contains(&self.rms_decay) {
            return Err(ConfigError::InvalidValue {
                name: "rms_decay",
                value: self.rms_decay,
                expected: "in [0, 1)",
            });
        }
        Ok(())
    }

    /// Learning rate for zero-based `epoch`.
    pub fn learning_rate_at(&self, epoch: u32) -> f64 {
        self.learning_rate * self.decay_rate.powi(epoch as i32)
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                cpus.clamp(1, 16)
            }
        }
    }

    /// Loader settings matching this configuration.
    pub fn loader_config(&self, max_num_peds: usize, validation_fraction: f64) -> LoaderConfig {
        LoaderConfig {
            seq_length: self.seq_length,
            batch_size: self.batch_size,
            max_num_peds,
            validation_fraction,
            seed: self.seed,
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidValue {
            name,
            value,
            expected: "finite and > 0",
        });
    }
    Ok(())
}

// ── SampleConfig ────────────────────────────────────────────────

/// How the sampler turns a predicted distribution into a position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleMode {
    /// Draw from the bivariate Gaussian.
    #[default]
    Stochastic,
    /// Take the distribution mean.
    Mean,
}

/// Settings for [`Sampler`](crate::sampler::Sampler).
#[derive(Clone, Debug, PartialEq)]
pub struct SampleConfig {
    /// Observed frames fed with ground truth. Default: 6.
    pub obs_length: usize,
    /// Frames predicted after the observation. Default: 6.
    pub pred_length: usize,
    /// Seed for stochastic draws. Default: 0.
    pub seed: u64,
    /// Draw or take the mean. Default: stochastic.
    pub mode: SampleMode,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            obs_length: 6,
            pred_length: 6,
            seed: 0,
            mode: SampleMode::Stochastic,
        }
    }
}

impl SampleConfig {
    /// Validate all settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.obs_length == 0 {
            return Err(ConfigError::ZeroSize { name: "obs_length" });
        }
        if self.pred_length == 0 {
            return Err(ConfigError::ZeroSize { name: "pred_length" });
        }
        Ok(())
    }

    /// Total frames of a sampled trajectory, `obs_length + pred_length`.
    pub fn total_length(&self) -> usize {
        self.obs_length + self.pred_length
    }
}
