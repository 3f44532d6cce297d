//! Training and sampling errors.

use std::fmt;

use throng_checkpoint::CheckpointError;
use throng_core::{ConfigError, ShapeError};
use throng_data::DataError;
use throng_model::ModelError;

/// Errors from [`Trainer`](crate::trainer::Trainer).
#[derive(Debug)]
pub enum TrainError {
    /// Invalid training settings.
    Config(ConfigError),
    /// The model rejected a batch or produced a non-finite loss.
    Model(ModelError),
    /// The data loader failed.
    Data(DataError),
    /// A checkpoint could not be written.
    Checkpoint(CheckpointError),
    /// The loader yields no full training batch.
    NoTrainingBatches,
    /// A gradient worker thread panicked.
    WorkerPanicked,
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid training configuration: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
            Self::Data(e) => write!(f, "data error: {e}"),
            Self::Checkpoint(e) => write!(f, "checkpoint error: {e}"),
            Self::NoTrainingBatches => write!(f, "no full training batch available"),
            Self::WorkerPanicked => write!(f, "gradient worker thread panicked"),
        }
    }
}

impl std::error::Error for TrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Data(e) => Some(e),
            Self::Checkpoint(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for TrainError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ModelError> for TrainError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<DataError> for TrainError {
    fn from(e: DataError) -> Self {
        Self::Data(e)
    }
}

impl From<CheckpointError> for TrainError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}

/// Errors from [`Sampler`](crate::sampler::Sampler) and
/// [`evaluate`](crate::evaluate::evaluate).
#[derive(Debug)]
pub enum SampleError {
    /// Invalid sampling settings.
    Config(ConfigError),
    /// The model rejected a frame.
    Model(ModelError),
    /// The data loader failed.
    Data(DataError),
    /// The requested checkpoint is missing or unreadable.
    Checkpoint(CheckpointError),
    /// The observed sequence is shorter than `obs_length`.
    ObservationTooShort {
        /// Frames supplied.
        frames: usize,
        /// Frames required.
        needed: usize,
    },
    /// The loader yielded no trajectory to evaluate.
    NoTrajectories,
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid sampling configuration: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
            Self::Data(e) => write!(f, "data error: {e}"),
            Self::Checkpoint(e) => write!(f, "checkpoint error: {e}"),
            Self::ObservationTooShort { frames, needed } => {
                write!(f, "observed sequence has {frames} frames, need {needed}")
            }
            Self::NoTrajectories => write!(f, "no trajectories to evaluate"),
        }
    }
}

impl std::error::Error for SampleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Data(e) => Some(e),
            Self::Checkpoint(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SampleError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ModelError> for SampleError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<ShapeError> for SampleError {
    fn from(e: ShapeError) -> Self {
        Self::Model(ModelError::from(e))
    }
}

impl From<DataError> for SampleError {
    fn from(e: DataError) -> Self {
        Self::Data(e)
    }
}

impl From<CheckpointError> for SampleError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}
