//! In-memory checkpoint record.

use throng_core::ModelConfig;
use throng_model::{ModelError, Params, SocialLstm};

/// Training metadata stored alongside the weights.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointMeta {
    /// Zero-based epoch after which the weights were saved.
    pub epoch: u32,
    /// Mean training loss over the epoch.
    pub train_loss: f64,
    /// Mean validation loss, if a validation pass ran.
    pub validation_loss: Option<f64>,
}

/// A complete, self-describing model snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    /// Training metadata.
    pub meta: CheckpointMeta,
    /// Hyperparameters fixing every tensor shape.
    pub config: ModelConfig,
    /// Weight tensors.
    pub params: Params,
}

impl Checkpoint {
    /// Snapshot a model.
    pub fn from_model(model: &SocialLstm, meta: CheckpointMeta) -> Self {
        Self {
            meta,
            config: model.config().clone(),
            params: model.params().clone(),
        }
    }

    /// Rebuild the model.
    ///
    /// # Errors
    ///
    /// [`ModelError`] if the weights do not fit the configuration.
    pub fn into_model(self) -> Result<SocialLstm, ModelError> {
        SocialLstm::from_params(self.config, self.params)
    }
}
