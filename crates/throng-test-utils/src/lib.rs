//! Test fixtures for Throng development.
//!
//! Small hyperparameter records, hand-built scenes, and a scratch
//! directory helper for tests that touch the filesystem.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::path::PathBuf;

use throng_core::{Frame, Sequence, Slot};

/// Build a sequence from per-frame `(id, x, y)` lists.
///
/// Each list fills slots from 0 in order; remaining slots stay empty.
///
/// # Panics
///
/// If a frame lists more than `max_num_peds` pedestrians, or `frames`
/// is empty.
pub fn scene(max_num_peds: usize, frames: &[&[(u32, f64, f64)]]) -> Sequence {
    let frames = frames
        .iter()
        .map(|rows| {
            assert!(rows.len() <= max_num_peds, "frame exceeds slot capacity");
            let mut frame = Frame::empty(max_num_peds);
            for (slot, &(id, x, y)) in frame.slots_mut().iter_mut().zip(rows.iter()) {
                *slot = Slot::new(id, x, y);
            }
            frame
        })
        .collect();
    Sequence::new(frames).expect("fixture scene must have at least one frame")
}

/// A fresh, empty directory under the system temp dir, unique per
/// process and `name`.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("throng-test-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
