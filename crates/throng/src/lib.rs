//! Throng: Social-LSTM pedestrian trajectory prediction.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Throng sub-crates. For most users, adding `throng` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use throng::prelude::*;
//!
//! // Two pedestrians over four frames, positions normalized to [0, 1].
//! let mut frames = Vec::new();
//! for t in 0..4 {
//!     let t = t as f64;
//!     frames.push(Frame::from_slots(vec![
//!         Slot::new(1, 0.1 + 0.05 * t, 0.2),
//!         Slot::new(2, 0.8 - 0.05 * t, 0.3),
//!     ]));
//! }
//! let scene = Sequence::new(frames).unwrap();
//!
//! let config = ModelConfig {
//!     rnn_size: 8,
//!     embedding_size: 4,
//!     grid_size: 2,
//!     max_num_peds: 2,
//!     neighborhood_size: 0.5,
//!     l2_param: 0.0,
//! };
//! let model = SocialLstm::new(config, 42).unwrap();
//!
//! let sample = SampleConfig {
//!     obs_length: 3,
//!     pred_length: 2,
//!     ..SampleConfig::default()
//! };
//! let sampler = Sampler::new(model, sample, SceneDimensions::UNIT).unwrap();
//! let predicted = sampler.sample_seeded(&scene).unwrap();
//! assert_eq!(predicted.len(), 5);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `throng-core` | Slots, frames, sequences, hyperparameters, errors |
//! | [`pool`] | `throng-pool` | Grid masks and social tensor pooling |
//! | [`model`] | `throng-model` | Social LSTM, density head, BPTT, RMSProp |
//! | [`data`] | `throng-data` | Annotation parsing, windowing, batch loading |
//! | [`checkpoint`] | `throng-checkpoint` | Binary weight checkpoints |
//! | [`engine`] | `throng-engine` | Trainer, sampler, displacement metrics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Scene representation and hyperparameters (`throng-core`).
pub use throng_core as types;

/// Spatial pooling (`throng-pool`).
///
/// [`pool::frame_mask`] bins neighbors around each agent;
/// [`pool::social_tensor`] sums their hidden states per bin.
pub use throng_pool as pool;

/// The Social LSTM (`throng-model`).
pub use throng_model as model;

/// Dataset loading (`throng-data`).
///
/// Parse annotation files with [`data::read_observations`], cut them
/// into windows, and iterate batches through [`data::DataLoader`].
pub use throng_data as data;

/// Weight checkpoints (`throng-checkpoint`).
pub use throng_checkpoint as checkpoint;

/// Training and inference (`throng-engine`).
///
/// [`engine::Trainer`] fits a model; [`engine::Sampler`] predicts
/// trajectories; [`engine::evaluate`] scores them.
pub use throng_engine as engine;

/// Common imports for typical Throng usage.
pub mod prelude {
    // Scene and configuration
    pub use throng_core::{
        ConfigError, Frame, ModelConfig, PedId, SceneDimensions, Sequence, ShapeError, Slot,
    };

    // Pooling
    pub use throng_pool::{frame_mask, sequence_masks, GridMask, PoolingGrid};

    // Model
    pub use throng_model::{Gaussian2d, ModelError, Params, RecurrentState, SocialLstm};

    // Data
    pub use throng_data::{Batch, DataError, DataLoader, Layout, LoaderConfig, SequenceLoader};

    // Checkpoints
    pub use throng_checkpoint::{Checkpoint, CheckpointError, CheckpointMeta, CheckpointStore};

    // Engine
    pub use throng_engine::{
        evaluate, EvaluationReport, SampleConfig, SampleError, SampleMode, Sampler, TrainConfig,
        TrainError, Trainer,
    };
}
