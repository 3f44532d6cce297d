//! Training and inference orchestration for Throng.
//!
//! [`Trainer`] runs the epoch loop: learning-rate decay, shuffled
//! batches with per-sequence gradients computed on worker threads,
//! global-norm clipping, RMSProp, a forward-only validation pass, and
//! periodic checkpoints. [`Sampler`] rolls a trained model forward from
//! an observed prefix, and [`evaluate`] scores its predictions with the
//! displacement metrics in [`metrics`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod sampler;
pub mod trainer;

pub use config::{SampleConfig, SampleMode, TrainConfig};
pub use error::{SampleError, TrainError};
pub use evaluate::{evaluate, EvaluationReport, TrajectoryResult};
pub use metrics::{displacement_errors, final_displacement_error, mean_displacement_error};
pub use sampler::Sampler;
pub use trainer::{EpochReport, StepReport, Trainer, TrainingSummary};
