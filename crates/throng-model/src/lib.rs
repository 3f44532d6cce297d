//! The Social LSTM model for Throng.
//!
//! One set of shared weights drives a per-slot LSTM. Every frame, each
//! slot's position and pooled social tensor are embedded, concatenated,
//! and fed through the cell; the new hidden state is projected onto the
//! five parameters of a bivariate Gaussian over the next position.
//!
//! Training uses [`SocialLstm::loss_and_grad`], a hand-written
//! backpropagation through time over one sequence. Inference uses
//! [`SocialLstm::step`], one frame at a time.
//!
//! All arithmetic is `f64` on flat row-major buffers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod density;
pub mod error;
pub mod linalg;
pub mod lstm;
pub mod model;
pub mod optimizer;
pub mod params;
pub mod state;

pub use density::{Gaussian2d, PDF_EPSILON};
pub use error::ModelError;
pub use model::{SequenceLoss, SocialLstm, StepOutput};
pub use optimizer::{clip_by_global_norm, RmsProp};
pub use params::{Params, PARAM_NAMES};
pub use state::RecurrentState;
