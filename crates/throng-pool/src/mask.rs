//! Grid mask construction.
//!
//! For agent `i` the pooling window is the square of side `S` (scene
//! units) centred on its position. The window is half-open,
//! `[-S/2, S/2)` on each axis, and divided into `G×G` equal cells.
//! Neighbor `j` lands in cell `(cx, cy)` with
//! `cx = floor((x_j - x_i + S/2) / (S/G))` and bin index `cx + cy·G`.
//! Pairs involving an empty slot, the agent itself, or a neighbor
//! outside the window get an all-zero row.

use smallvec::SmallVec;
use throng_core::{Frame, ModelConfig, SceneDimensions, Sequence, ShapeError};

/// Geometry of the pooling grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoolingGrid {
    /// Window side `S`, in scene units.
    pub neighborhood_size: f64,
    /// Cells per axis `G`.
    pub grid_size: usize,
    /// Scene extent used to convert `S` into position units.
    pub dimensions: SceneDimensions,
}

impl PoolingGrid {
    /// Grid geometry from a model configuration and scene dimensions.
    pub fn from_config(config: &ModelConfig, dimensions: SceneDimensions) -> Self {
        Self {
            neighborhood_size: config.neighborhood_size,
            grid_size: config.grid_size,
            dimensions,
        }
    }

    /// Number of bins, `G²`.
    pub fn cells(&self) -> usize {
        self.grid_size * self.grid_size
    }

    /// The bin neighbor `other` falls into relative to `agent`, or `None`
    /// if it lies outside the window.
    pub fn bin_of(&self, agent: [f64; 2], other: [f64; 2]) -> Option<usize> {
        let width_bound = self.neighborhood_size / self.dimensions.width;
        let height_bound = self.neighborhood_size / self.dimensions.height;

        let width_low = agent[0] - width_bound / 2.0;
        let width_high = agent[0] + width_bound / 2.0;
        let height_low = agent[1] - height_bound / 2.0;
        let height_high = agent[1] + height_bound / 2.0;

        if other[0] >= width_high
            || other[0] < width_low
            || other[1] >= height_high
            || other[1] < height_low
        {
            return None;
        }

        let g = self.grid_size as f64;
        let cell_x = ((other[0] - width_low) / width_bound * g).floor();
        let cell_y = ((other[1] - height_low) / height_bound * g).floor();
        // Rounding can push a point just inside the high edge onto cell G.
        if !(0.0..g).contains(&cell_x) || !(0.0..g).contains(&cell_y) {
            return None;
        }
        Some(cell_x as usize + cell_y as usize * self.grid_size)
    }
}

/// Dense `[N, N, G²]` occupancy tensor for one frame.
///
/// Entry `(i, j, b)` is the weight with which neighbor `j`'s hidden
/// state enters bin `b` of agent `i`'s social tensor. Masks built by
/// [`frame_mask`] are 0/1 with at most one set bin per `(i, j)`.
#[derive(Clone, Debug, PartialEq)]
pub struct GridMask {
    num_peds: usize,
    grid_size: usize,
    data: Vec<f64>,
}

impl GridMask {
    /// An all-zero mask.
    pub fn zeros(num_peds: usize, grid_size: usize) -> Self {
        Self {
            num_peds,
            grid_size,
            data: vec![0.0; num_peds * num_peds * grid_size * grid_size],
        }
    }

    /// Wrap a flat row-major `[N, N, G²]` buffer.
    ///
    /// # Errors
    ///
    /// [`ShapeError::MaskShape`] if the buffer length is not `N·N·G²`.
    pub fn from_raw(num_peds: usize, grid_size: usize, data: Vec<f64>) -> Result<Self, ShapeError> {
        let expected = num_peds * num_peds * grid_size * grid_size;
        if data.len() != expected {
            return Err(ShapeError::MaskShape {
                reason: format!(
                    "buffer has {} entries, expected {num_peds}x{num_peds}x{} = {expected}",
                    data.len(),
                    grid_size * grid_size
                ),
            });
        }
        Ok(Self {
            num_peds,
            grid_size,
            data,
        })
    }

    /// Slot capacity `N`.
    pub fn num_peds(&self) -> usize {
        self.num_peds
    }

    /// Cells per axis `G`.
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Number of bins `G²`.
    pub fn cells(&self) -> usize {
        self.grid_size * self.grid_size
    }

    /// The flat `[N, N, G²]` buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    fn offset(&self, agent: usize, neighbour: usize) -> usize {
        (agent * self.num_peds + neighbour) * self.cells()
    }

    /// The `G²` bin weights of one (agent, neighbor) pair.
    pub fn row(&self, agent: usize, neighbour: usize) -> &[f64] {
        let start = self.offset(agent, neighbour);
        &self.data[start..start + self.cells()]
    }

    /// Set one bin weight.
    pub fn set(&mut self, agent: usize, neighbour: usize, bin: usize, value: f64) {
        let start = self.offset(agent, neighbour);
        self.data[start + bin] = value;
    }

    /// The first non-zero bin of a pair, if any.
    pub fn bin(&self, agent: usize, neighbour: usize) -> Option<usize> {
        self.row(agent, neighbour).iter().position(|&w| w != 0.0)
    }

    /// Every non-zero `(neighbour, bin, weight)` entry of one agent.
    pub fn entries(&self, agent: usize) -> SmallVec<[(usize, usize, f64); 8]> {
        let mut out = SmallVec::new();
        for neighbour in 0..self.num_peds {
            for (bin, &w) in self.row(agent, neighbour).iter().enumerate() {
                if w != 0.0 {
                    out.push((neighbour, bin, w));
                }
            }
        }
        out
    }

    /// Check the mask against the configured slot capacity and grid.
    ///
    /// # Errors
    ///
    /// [`ShapeError::MaskShape`] describing the mismatch.
    pub fn check_shape(&self, num_peds: usize, grid_size: usize) -> Result<(), ShapeError> {
        if self.num_peds != num_peds || self.grid_size != grid_size {
            return Err(ShapeError::MaskShape {
                reason: format!(
                    "mask is {}x{}x{}², model expects {num_peds}x{num_peds}x{grid_size}²",
                    self.num_peds, self.num_peds, self.grid_size
                ),
            });
        }
        Ok(())
    }
}

/// Build the grid mask of one frame.
pub fn frame_mask(frame: &Frame, grid: &PoolingGrid) -> GridMask {
    let n = frame.capacity();
    let mut mask = GridMask::zeros(n, grid.grid_size);
    let slots = frame.slots();

    for (i, agent) in slots.iter().enumerate() {
        if !agent.exists() {
            continue;
        }
        for (j, other) in slots.iter().enumerate() {
            if i == j || !other.exists() || other.id == agent.id {
                continue;
            }
            if let Some(bin) = grid.bin_of(agent.position(), other.position()) {
                mask.set(i, j, bin, 1.0);
            }
        }
    }
    mask
}

/// Build one grid mask per frame of a sequence.
pub fn sequence_masks(sequence: &Sequence, grid: &PoolingGrid) -> Vec<GridMask> {
    sequence
        .frames()
        .iter()
        .map(|frame| frame_mask(frame, grid))
        .collect()
}
