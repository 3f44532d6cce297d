//! Frame grouping and window extraction.
//!
//! Frames are ordered by id. Windows of `seq_length + 1` consecutive
//! frames start every `seq_length` frames, so neighboring windows share
//! one boundary frame. Within a window, pedestrians take slots in order
//! of first appearance; once all `max_num_peds` slots are taken, later
//! arrivals are dropped for that window. A pedestrian listed twice in
//! one frame keeps its last record.

use indexmap::IndexMap;
use throng_core::{Frame, Sequence, Slot};
use tracing::debug;

use crate::error::DataError;
use crate::parse::Observation;

/// Cut observations into fixed-capacity windows of `seq_length + 1`
/// frames.
///
/// # Errors
///
/// [`DataError::Empty`] for no observations,
/// [`DataError::TooFewFrames`] if not even one window fits.
pub fn build_windows(
    observations: &[Observation],
    seq_length: usize,
    max_num_peds: usize,
) -> Result<Vec<Sequence>, DataError> {
    if observations.is_empty() {
        return Err(DataError::Empty);
    }

    let mut frames: IndexMap<u32, Vec<&Observation>> = IndexMap::new();
    for obs in observations {
        frames.entry(obs.frame).or_default().push(obs);
    }
    frames.sort_keys();
    let frames: Vec<Vec<&Observation>> = frames.into_values().collect();

    let needed = seq_length + 1;
    if seq_length == 0 || frames.len() < needed {
        return Err(DataError::TooFewFrames {
            frames: frames.len(),
            needed,
        });
    }

    let mut windows = Vec::new();
    let mut start = 0;
    while start + needed <= frames.len() {
        windows.push(lay_out(&frames[start..start + needed], max_num_peds)?);
        start += seq_length;
    }
    Ok(windows)
}

fn lay_out(frames: &[Vec<&Observation>], max_num_peds: usize) -> Result<Sequence, DataError> {
    let mut slots: IndexMap<u32, usize> = IndexMap::new();
    let mut dropped = 0usize;
    let mut duplicates = 0usize;
    let mut out = Vec::with_capacity(frames.len());

    for observations in frames {
        let mut frame = Frame::empty(max_num_peds);
        for obs in observations {
            let slot = match slots.get(&obs.ped) {
                Some(&slot) => slot,
                None if slots.len() < max_num_peds => {
                    let slot = slots.len();
                    slots.insert(obs.ped, slot);
                    slot
                }
                None => {
                    dropped += 1;
                    continue;
                }
            };
            let target = &mut frame.slots_mut()[slot];
            if target.exists() {
                duplicates += 1;
            }
            *target = Slot::new(obs.ped, obs.x, obs.y);
        }
        out.push(frame);
    }

    if dropped > 0 {
        debug!(
            dropped,
            max_num_peds, "window exceeds slot capacity, dropped observations"
        );
    }
    if duplicates > 0 {
        debug!(duplicates, "pedestrian repeated within a frame, kept last record");
    }
    Ok(Sequence::new(out)?)
}
