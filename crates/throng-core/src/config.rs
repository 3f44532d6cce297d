//! Model hyperparameter record.
//!
//! [`ModelConfig`] fixes every tensor shape in the model: slot capacity,
//! pooling grid, embedding and recurrent widths. It is persisted verbatim
//! in checkpoints so inference rebuilds the same shapes.

use crate::error::ConfigError;

/// Number of raw outputs of the density head: `(μx, μy, σx, σy, ρ)`.
pub const OUTPUT_SIZE: usize = 5;

/// Shape-defining hyperparameters of the social LSTM.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Width `H` of the LSTM hidden and cell state. Default: 128.
    pub rnn_size: usize,
    /// Width `E` of each input embedding. Default: 64.
    pub embedding_size: usize,
    /// Pooling grid resolution `G`; the grid has `G²` bins. Default: 4.
    pub grid_size: usize,
    /// Slot capacity `N` of every frame. Default: 40.
    pub max_num_peds: usize,
    /// Side `S` of the square pooling window, in scene units. Default: 32.
    pub neighborhood_size: f64,
    /// L2 penalty coefficient `λ`. Default: 0.0005.
    pub l2_param: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            rnn_size: 128,
            embedding_size: 64,
            grid_size: 4,
            max_num_peds: 40,
            neighborhood_size: 32.0,
            l2_param: 0.0005,
        }
    }
}

impl ModelConfig {
    /// Number of pooling bins, `G²`.
    pub fn grid_cells(&self) -> usize {
        self.grid_size * self.grid_size
    }

    /// Width of one agent's flattened social tensor, `G²·H`.
    pub fn social_size(&self) -> usize {
        self.grid_cells() * self.rnn_size
    }

    /// Width of the concatenated LSTM input, `2E`.
    pub fn cell_input_size(&self) -> usize {
        2 * self.embedding_size
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rnn_size == 0 {
            return Err(ConfigError::ZeroSize { name: "rnn_size" });
        }
        if self.embedding_size == 0 {
            return Err(ConfigError::ZeroSize {
                name: "embedding_size",
            });
        }
        if self.grid_size == 0 {
            return Err(ConfigError::ZeroSize { name: "grid_size" });
        }
        if self.max_num_peds == 0 {
            return Err(ConfigError::ZeroSize {
                name: "max_num_peds",
            });
        }
        if !self.neighborhood_size.is_finite() || self.neighborhood_size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "neighborhood_size",
                value: self.neighborhood_size,
                expected: "finite and > 0",
            });
        }
        if !self.l2_param.is_finite() || self.l2_param < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "l2_param",
                value: self.l2_param,
                expected: "finite and >= 0",
            });
        }
        if self.checked_tensor_sizes().is_none() {
            return Err(ConfigError::Inconsistent {
                reason: format!(
                    "tensor sizes for grid {}, rnn {}, embedding {} overflow usize",
                    self.grid_size, self.rnn_size, self.embedding_size
                ),
            });
        }
        Ok(())
    }

    /// Largest tensor sizes, or `None` if any of them overflows. Must
    /// pass before the unchecked helpers above are used.
    fn checked_tensor_sizes(&self) -> Option<[usize; 3]> {
        let e = self.embedding_size;
        let h = self.rnn_size;
        let social = self.grid_size.checked_mul(self.grid_size)?.checked_mul(h)?;
        let tensor_w = social.checked_mul(e)?;
        let gates = h.checked_mul(4)?;
        let lstm_w = e.checked_mul(2)?.checked_add(h)?.checked_mul(gates)?;
        let out_w = h.checked_mul(OUTPUT_SIZE)?;
        Some([tensor_w, lstm_w, out_w])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = ModelConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.grid_cells(), 16);
        assert_eq!(cfg.social_size(), 16 * 128);
        assert_eq!(cfg.cell_input_size(), 128);
    }

    #[test]
    fn zero_sizes_rejected() {
        let cfg = ModelConfig {
            grid_size: 0,
            ..ModelConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroSize { name: "grid_size" })
        );

        let cfg = ModelConfig {
            max_num_peds: 0,
            ..ModelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_finite_reals_rejected() {
        let cfg = ModelConfig {
            neighborhood_size: f64::NAN,
            ..ModelConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue {
                name: "neighborhood_size",
                ..
            })
        ));

        let cfg = ModelConfig {
            l2_param: -0.1,
            ..ModelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overflowing_shapes_rejected() {
        let huge = ModelConfig {
            grid_size: u32::MAX as usize,
            rnn_size: u32::MAX as usize,
            ..ModelConfig::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(ConfigError::Inconsistent { .. })
        ));

        // The social tensor fits; the LSTM kernel does not.
        let wide = ModelConfig {
            grid_size: 1,
            rnn_size: u32::MAX as usize,
            embedding_size: 1,
            ..ModelConfig::default()
        };
        assert!(wide.validate().is_err());
    }
}
