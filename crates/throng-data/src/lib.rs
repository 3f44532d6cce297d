//! Trajectory datasets for Throng.
//!
//! Raw annotations are `(frame, pedestrian, x, y)` observations. They are
//! grouped by frame, cut into windows of `seq_length + 1` consecutive
//! frames, and laid out on fixed-capacity slots ([`Sequence`]). A
//! [`SequenceLoader`] splits windows into training and validation sets
//! and serves `(input, target)` batches, the target being the input
//! shifted by one frame.
//!
//! Grid masks are not built here; see `throng-pool`.
//!
//! [`Sequence`]: throng_core::Sequence

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod loader;
pub mod parse;
pub mod windows;

pub use error::DataError;
pub use loader::{Batch, DataLoader, LoaderConfig, SequenceLoader};
pub use parse::{parse_observations, read_observations, Layout, Observation};
pub use windows::build_windows;
