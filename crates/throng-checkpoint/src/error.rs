//! Checkpoint errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

use throng_model::ModelError;

/// Errors from writing, reading, or locating checkpoints.
#[derive(Debug)]
pub enum CheckpointError {
    /// An I/O error occurred.
    Io(io::Error),
    /// The stream does not start with `b"THRG"`.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// The stream is truncated or structurally invalid.
    Malformed {
        /// What went wrong.
        detail: String,
    },
    /// The weights do not fit the recorded hyperparameters.
    Model(ModelError),
    /// The stored hash does not match the decoded weights.
    HashMismatch {
        /// Hash recorded in the file.
        recorded: u64,
        /// Hash of the weights as read.
        computed: u64,
    },
    /// No checkpoint exists for the requested epoch.
    NotFound {
        /// Directory searched.
        dir: PathBuf,
        /// Requested epoch, or `None` for "latest".
        epoch: Option<u32>,
    },
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"THRG\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported checkpoint format version {found}")
            }
            Self::Malformed { detail } => write!(f, "malformed checkpoint: {detail}"),
            Self::Model(e) => write!(f, "checkpoint does not match its hyperparameters: {e}"),
            Self::HashMismatch { recorded, computed } => write!(
                f,
                "weights hash mismatch: recorded={recorded:#018x}, computed={computed:#018x}"
            ),
            Self::NotFound { dir, epoch } => match epoch {
                Some(e) => write!(f, "no checkpoint for epoch {e} in {}", dir.display()),
                None => write!(f, "no checkpoints in {}", dir.display()),
            },
        }
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ModelError> for CheckpointError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}
