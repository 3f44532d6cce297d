//! Model construction and evaluation errors.

use std::error::Error;
use std::fmt;

use throng_core::{ConfigError, ShapeError};

/// Errors from building or running a [`SocialLstm`](crate::SocialLstm).
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// The hyperparameter record failed validation.
    Config(ConfigError),
    /// Frames or masks do not match the configured shapes.
    Shape(ShapeError),
    /// A weight tensor does not have the length its hyperparameters imply.
    ParamLength {
        /// Tensor name, one of [`PARAM_NAMES`](crate::PARAM_NAMES).
        name: &'static str,
        /// Length implied by the hyperparameter record.
        expected: usize,
        /// Length supplied.
        found: usize,
    },
    /// The wrong number of weight tensors was supplied.
    TensorCount {
        /// Tensors the model has.
        expected: usize,
        /// Tensors supplied.
        found: usize,
    },
    /// A loss or gradient evaluated to NaN or infinity.
    NonFinite {
        /// What was being computed.
        context: &'static str,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid model configuration: {e}"),
            Self::Shape(e) => write!(f, "shape mismatch: {e}"),
            Self::ParamLength {
                name,
                expected,
                found,
            } => write!(
                f,
                "weight tensor '{name}' has {found} values, expected {expected}"
            ),
            Self::TensorCount { expected, found } => {
                write!(f, "got {found} weight tensors, expected {expected}")
            }
            Self::NonFinite { context } => write!(f, "non-finite value in {context}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ModelError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ShapeError> for ModelError {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}
