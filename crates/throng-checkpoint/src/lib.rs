//! Model checkpoints for Throng.
//!
//! A checkpoint carries everything needed to rebuild a model for
//! inference: the hyperparameter record, every weight tensor, and a
//! little training metadata. The binary format is written and read by
//! [`codec`]; [`CheckpointStore`] manages one file per epoch in a
//! directory.
//!
//! # Format
//!
//! ```text
//! [MAGIC "THRG"] [VERSION u8]
//! [epoch u32] [train_loss f64] [has_validation u8] [validation_loss f64]?
//! [rnn_size u32] [embedding_size u32] [grid_size u32] [max_num_peds u32]
//! [neighborhood_size f64] [l2_param f64] [output_size u32]
//! [tensor_count u32] ([name str] [len u32] [values f64 × len])*
//! [weights_hash u64]
//! ```
//!
//! All integers and floats are little-endian; strings are `u32`
//! length-prefixed UTF-8. The trailing hash is FNV-1a over the weight
//! bits and catches truncated or corrupted files.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod store;
pub mod types;

pub use codec::{decode_checkpoint, encode_checkpoint};
pub use error::CheckpointError;
pub use hash::weights_hash;
pub use store::CheckpointStore;
pub use types::{Checkpoint, CheckpointMeta};

/// Magic bytes at the start of every checkpoint file.
pub const MAGIC: [u8; 4] = *b"THRG";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
