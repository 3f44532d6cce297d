//! Per-slot recurrent state.

/// Hidden and cell state for every slot of a frame.
///
/// Stored as two contiguous `[N, H]` buffers indexed by slot. A fresh
/// state is all zeros; it lives for one sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct RecurrentState {
    rnn_size: usize,
    hidden: Vec<f64>,
    cell: Vec<f64>,
}

impl RecurrentState {
    /// All-zero state for `num_peds` slots of width `rnn_size`.
    pub fn zeros(num_peds: usize, rnn_size: usize) -> Self {
        Self {
            rnn_size,
            hidden: vec![0.0; num_peds * rnn_size],
            cell: vec![0.0; num_peds * rnn_size],
        }
    }

    pub(crate) fn from_parts(rnn_size: usize, hidden: Vec<f64>, cell: Vec<f64>) -> Self {
        debug_assert_eq!(hidden.len(), cell.len());
        Self {
            rnn_size,
            hidden,
            cell,
        }
    }

    /// Number of slots.
    pub fn num_peds(&self) -> usize {
        if self.rnn_size == 0 {
            0
        } else {
            self.hidden.len() / self.rnn_size
        }
    }

    /// Width `H` of each slot's state.
    pub fn rnn_size(&self) -> usize {
        self.rnn_size
    }

    /// Hidden state of one slot.
    pub fn hidden(&self, slot: usize) -> &[f64] {
        &self.hidden[slot * self.rnn_size..(slot + 1) * self.rnn_size]
    }

    /// Cell state of one slot.
    pub fn cell(&self, slot: usize) -> &[f64] {
        &self.cell[slot * self.rnn_size..(slot + 1) * self.rnn_size]
    }

    /// The whole `[N, H]` hidden buffer.
    pub fn hidden_all(&self) -> &[f64] {
        &self.hidden
    }

    /// The whole `[N, H]` cell buffer.
    pub fn cell_all(&self) -> &[f64] {
        &self.cell
    }
}
