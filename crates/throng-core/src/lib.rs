//! Core types for the Throng trajectory predictor.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! fixed-capacity scene representation shared by every other crate
//! (pedestrian ids, agent slots, frames, sequences), the model
//! hyperparameter record, and the shape/configuration error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod scene;

pub use config::{ModelConfig, OUTPUT_SIZE};
pub use error::{ConfigError, ShapeError};
pub use scene::{Frame, PedId, SceneDimensions, Sequence, Slot, SLOT_COLUMNS};
