//! Fixed-capacity scene representation.
//!
//! A [`Sequence`] is an ordered run of [`Frame`]s. Every frame holds
//! exactly `max_num_peds` [`Slot`]s; a slot is either occupied by a
//! pedestrian (`id > 0`) or empty (`id == 0`, position `(0, 0)`). Keeping
//! the slot count constant lets the recurrent core and the loss iterate
//! the same index range every frame, with existence carried as a flag
//! instead of a dynamically sized collection.
//!
//! The flat array form used at crate boundaries is
//! `[seq_length, max_num_peds, 3]` with columns `(id, x, y)`.

use std::fmt;

use smallvec::SmallVec;

use crate::error::{ConfigError, ShapeError};

/// Number of columns per slot in the flat array form: `(id, x, y)`.
pub const SLOT_COLUMNS: usize = 3;

/// Identifies a pedestrian within one sequence.
///
/// `PedId(0)` is reserved for empty slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PedId(pub u32);

impl PedId {
    /// The id carried by empty slots.
    pub const NONE: PedId = PedId(0);

    /// Whether this id denotes a real pedestrian.
    pub fn exists(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PedId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// One agent slot of a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Slot {
    /// Pedestrian occupying the slot, or [`PedId::NONE`].
    pub id: PedId,
    /// Horizontal position, normalized to the scene bounds.
    pub x: f64,
    /// Vertical position, normalized to the scene bounds.
    pub y: f64,
}

impl Slot {
    /// An unoccupied slot at the origin.
    pub const EMPTY: Slot = Slot {
        id: PedId::NONE,
        x: 0.0,
        y: 0.0,
    };

    /// An occupied slot.
    pub fn new(id: impl Into<PedId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
        }
    }

    /// Whether a pedestrian occupies this slot.
    pub fn exists(&self) -> bool {
        self.id.exists()
    }

    /// The slot position as `[x, y]`.
    pub fn position(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// All agent slots at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    slots: Vec<Slot>,
}

impl Frame {
    /// A frame of `capacity` empty slots.
    pub fn empty(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::EMPTY; capacity],
        }
    }

    /// Wrap an explicit slot vector. Its length is the frame capacity.
    pub fn from_slots(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    /// Number of slots (`max_num_peds`).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// All slots in slot order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Mutable access to the slots. Capacity cannot change through this.
    pub fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    /// The slot at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Positions of every slot, occupied or not.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        self.slots.iter().map(Slot::position).collect()
    }

    /// Indices of occupied slots, in slot order.
    pub fn active_slots(&self) -> SmallVec<[usize; 16]> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.exists())
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of occupied slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.exists()).count()
    }
}

/// An ordered run of frames sharing one slot capacity.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    frames: Vec<Frame>,
    max_num_peds: usize,
}

impl Sequence {
    /// Build a sequence, checking every frame has the same capacity.
    ///
    /// # Errors
    ///
    /// [`ShapeError::EmptySequence`] for zero frames,
    /// [`ShapeError::FrameCapacity`] if capacities disagree with frame 0.
    pub fn new(frames: Vec<Frame>) -> Result<Self, ShapeError> {
        let first = frames.first().ok_or(ShapeError::EmptySequence)?;
        let max_num_peds = first.capacity();
        for (t, frame) in frames.iter().enumerate() {
            if frame.capacity() != max_num_peds {
                return Err(ShapeError::FrameCapacity {
                    frame: t,
                    expected: max_num_peds,
                    found: frame.capacity(),
                });
            }
        }
        Ok(Self {
            frames,
            max_num_peds,
        })
    }

    /// Decode a flat row-major `[seq_length, max_num_peds, 3]` array.
    ///
    /// # Errors
    ///
    /// [`ShapeError::ArrayLength`] if `data` does not have
    /// `seq_length * max_num_peds * 3` elements, and
    /// [`ShapeError::InvalidPedId`] for negative or fractional ids.
    pub fn from_array(
        data: &[f64],
        seq_length: usize,
        max_num_peds: usize,
    ) -> Result<Self, ShapeError> {
        let expected = seq_length * max_num_peds * SLOT_COLUMNS;
        if data.len() != expected {
            return Err(ShapeError::ArrayLength {
                expected,
                found: data.len(),
            });
        }
        if seq_length == 0 {
            return Err(ShapeError::EmptySequence);
        }
        if max_num_peds == 0 {
            return Ok(Self {
                frames: vec![Frame::empty(0); seq_length],
                max_num_peds,
            });
        }
        let mut frames = Vec::with_capacity(seq_length);
        for (t, rows) in data.chunks_exact(max_num_peds * SLOT_COLUMNS).enumerate() {
            let mut slots = Vec::with_capacity(max_num_peds);
            for (s, row) in rows.chunks_exact(SLOT_COLUMNS).enumerate() {
                let raw = row[0];
                if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw > u32::MAX as f64 {
                    return Err(ShapeError::InvalidPedId {
                        frame: t,
                        slot: s,
                        value: raw,
                    });
                }
                slots.push(Slot::new(raw as u32, row[1], row[2]));
            }
            frames.push(Frame::from_slots(slots));
        }
        Ok(Self {
            frames,
            max_num_peds,
        })
    }

    /// Encode as a flat row-major `[seq_length, max_num_peds, 3]` array.
    pub fn to_array(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.frames.len() * self.max_num_peds * SLOT_COLUMNS);
        for frame in &self.frames {
            for slot in frame.slots() {
                out.extend_from_slice(&[slot.id.0 as f64, slot.x, slot.y]);
            }
        }
        out
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for a constructed sequence; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Slot capacity shared by every frame.
    pub fn max_num_peds(&self) -> usize {
        self.max_num_peds
    }

    /// All frames in order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The frame at index `t`, if in range.
    pub fn frame(&self, t: usize) -> Option<&Frame> {
        self.frames.get(t)
    }

    /// The first `len` frames as a new sequence (clamped to at least one frame).
    pub fn prefix(&self, len: usize) -> Sequence {
        let len = len.clamp(1, self.frames.len());
        Sequence {
            frames: self.frames[..len].to_vec(),
            max_num_peds: self.max_num_peds,
        }
    }

    /// Split a window of `T + 1` frames into an `(input, target)` pair of
    /// `T` frames each, the target being the input shifted one frame.
    ///
    /// Returns `None` for a single-frame sequence.
    pub fn shifted_pair(&self) -> Option<(Sequence, Sequence)> {
        if self.frames.len() < 2 {
            return None;
        }
        let n = self.frames.len();
        let input = Sequence {
            frames: self.frames[..n - 1].to_vec(),
            max_num_peds: self.max_num_peds,
        };
        let target = Sequence {
            frames: self.frames[1..].to_vec(),
            max_num_peds: self.max_num_peds,
        };
        Some((input, target))
    }

    /// Append the frames of `other`, which must share the slot capacity.
    ///
    /// # Errors
    ///
    /// [`ShapeError::FrameCapacity`] if capacities differ.
    pub fn concat(mut self, other: Sequence) -> Result<Sequence, ShapeError> {
        if other.max_num_peds != self.max_num_peds {
            return Err(ShapeError::FrameCapacity {
                frame: self.frames.len(),
                expected: self.max_num_peds,
                found: other.max_num_peds,
            });
        }
        self.frames.extend(other.frames);
        Ok(self)
    }

    /// Check this sequence against a configured slot capacity.
    ///
    /// # Errors
    ///
    /// [`ShapeError::FrameCapacity`] naming frame 0 if capacities differ.
    pub fn check_capacity(&self, max_num_peds: usize) -> Result<(), ShapeError> {
        if self.max_num_peds != max_num_peds {
            return Err(ShapeError::FrameCapacity {
                frame: 0,
                expected: max_num_peds,
                found: self.max_num_peds,
            });
        }
        Ok(())
    }
}

/// Scene extent in the units the neighborhood size is expressed in.
///
/// Positions are normalized to `[0, 1]`; the neighborhood size is given
/// in scene units (pixels for the standard datasets), so the mask builder
/// divides by these dimensions to get the window in position units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneDimensions {
    /// Scene width.
    pub width: f64,
    /// Scene height.
    pub height: f64,
}

impl SceneDimensions {
    /// Dimensions where the neighborhood size is already in position units.
    pub const UNIT: SceneDimensions = SceneDimensions {
        width: 1.0,
        height: 1.0,
    };

    /// Explicit dimensions.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both extents must be finite and positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    value,
                    expected: "finite and > 0",
                });
            }
        }
        Ok(())
    }
}

impl Default for SceneDimensions {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
        }
    }
}
