//! Error types shared across the Throng workspace.
//!
//! Shape errors surface when tensors handed to the model do not match
//! the configured slot capacity or grid resolution. Configuration errors
//! surface when a hyperparameter record fails validation. Both are fatal
//! at construction time; nothing downstream tries to recover from them.

use std::error::Error;
use std::fmt;

/// A tensor or collection does not have the shape the model expects.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeError {
    /// A sequence was built from zero frames.
    EmptySequence,
    /// A frame's slot count differs from the configured `max_num_peds`.
    FrameCapacity {
        /// Index of the offending frame within its sequence.
        frame: usize,
        /// Slot capacity the model was built for.
        expected: usize,
        /// Slot capacity actually found.
        found: usize,
    },
    /// A flat `[seq_length, max_num_peds, 3]` array has the wrong length.
    ArrayLength {
        /// Element count implied by the requested shape.
        expected: usize,
        /// Element count supplied.
        found: usize,
    },
    /// A grid mask does not match `max_num_peds` or `grid_size²`.
    MaskShape {
        /// Human-readable description of the mismatch.
        reason: String,
    },
    /// Two sequences that must be aligned frame-by-frame differ in length.
    LengthMismatch {
        /// Length of the reference sequence.
        expected: usize,
        /// Length of the other sequence.
        found: usize,
    },
    /// A pedestrian id column held a value that is not a non-negative integer.
    InvalidPedId {
        /// Index of the offending frame.
        frame: usize,
        /// Index of the offending slot.
        slot: usize,
        /// The raw value.
        value: f64,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySequence => write!(f, "sequence has no frames"),
            Self::FrameCapacity {
                frame,
                expected,
                found,
            } => write!(
                f,
                "frame {frame} has {found} slots, expected max_num_peds = {expected}"
            ),
            Self::ArrayLength { expected, found } => {
                write!(f, "array has {found} elements, expected {expected}")
            }
            Self::MaskShape { reason } => write!(f, "grid mask shape mismatch: {reason}"),
            Self::LengthMismatch { expected, found } => {
                write!(f, "sequence has {found} frames, expected {expected}")
            }
            Self::InvalidPedId { frame, slot, value } => {
                write!(f, "frame {frame} slot {slot}: invalid pedestrian id {value}")
            }
        }
    }
}

impl Error for ShapeError {}

/// A hyperparameter record failed validation.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A size parameter that must be at least 1 was zero.
    ZeroSize {
        /// Name of the parameter.
        name: &'static str,
    },
    /// A real-valued parameter was NaN, infinite, or out of its range.
    InvalidValue {
        /// Name of the parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// The accepted range, for the message.
        expected: &'static str,
    },
    /// Two parameters are individually valid but inconsistent together.
    Inconsistent {
        /// Description of the conflict.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize { name } => write!(f, "{name} must be at least 1"),
            Self::InvalidValue {
                name,
                value,
                expected,
            } => write!(f, "{name} must be {expected}, got {value}"),
            Self::Inconsistent { reason } => write!(f, "inconsistent configuration: {reason}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_offending_values() {
        let e = ShapeError::FrameCapacity {
            frame: 3,
            expected: 40,
            found: 12,
        };
        let msg = e.to_string();
        assert!(msg.contains("frame 3"));
        assert!(msg.contains("40"));
        assert!(msg.contains("12"));

        let e = ConfigError::InvalidValue {
            name: "l2_param",
            value: -1.0,
            expected: "finite and >= 0",
        };
        assert_eq!(e.to_string(), "l2_param must be finite and >= 0, got -1");
    }
}
