//! Dataset errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

use throng_core::{ConfigError, ShapeError};

/// Errors from reading or batching trajectory data.
#[derive(Debug)]
pub enum DataError {
    /// Reading a dataset file failed.
    Io(io::Error),
    /// A dataset file could not be opened.
    Open {
        /// The file.
        path: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },
    /// A field could not be parsed.
    Parse {
        /// 1-based line number.
        line: usize,
        /// 1-based field index within the line.
        column: usize,
        /// What was wrong.
        reason: String,
    },
    /// No observations were found.
    Empty,
    /// Too few frames to cut even one window.
    TooFewFrames {
        /// Frames available.
        frames: usize,
        /// Frames one window needs (`seq_length + 1`).
        needed: usize,
    },
    /// Too few windows to fill one training batch.
    TooFewSequences {
        /// Training windows available.
        available: usize,
        /// Batch size requested.
        batch_size: usize,
    },
    /// The loader configuration is invalid.
    Config(ConfigError),
    /// A window could not be laid out on slots.
    Shape(ShapeError),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Open { path, source } => {
                write!(f, "cannot open dataset {}: {source}", path.display())
            }
            Self::Parse {
                line,
                column,
                reason,
            } => write!(f, "line {line}, field {column}: {reason}"),
            Self::Empty => write!(f, "dataset contains no observations"),
            Self::TooFewFrames { frames, needed } => write!(
                f,
                "dataset has {frames} frames, a window needs {needed}"
            ),
            Self::TooFewSequences {
                available,
                batch_size,
            } => write!(
                f,
                "{available} training sequences cannot fill a batch of {batch_size}"
            ),
            Self::Config(e) => write!(f, "invalid loader configuration: {e}"),
            Self::Shape(e) => write!(f, "shape error: {e}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Open { source, .. } => Some(source),
            Self::Config(e) => Some(e),
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DataError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ConfigError> for DataError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ShapeError> for DataError {
    fn from(e: ShapeError) -> Self {
        Self::Shape(e)
    }
}
