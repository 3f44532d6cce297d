//! Benchmark profiles for the Throng trajectory predictor.
//!
//! - [`reference_config`]: the default model shape with 20 slots
//! - [`crowd_scene`]: a deterministic random-walk crowd

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use throng_core::{Frame, ModelConfig, Sequence, Slot};

/// Default widths and grid with `max_num_peds = 20`.
pub fn reference_config() -> ModelConfig {
    ModelConfig {
        max_num_peds: 20,
        ..ModelConfig::default()
    }
}

/// `num_agents` pedestrians taking small random steps inside the unit
/// square for `frames` frames, in a frame of `max_num_peds` slots.
///
/// Deterministic for a given `seed`.
///
/// # Panics
///
/// If `num_agents > max_num_peds` or `frames == 0`.
pub fn crowd_scene(num_agents: usize, frames: usize, max_num_peds: usize, seed: u64) -> Sequence {
    assert!(num_agents <= max_num_peds, "more agents than slots");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut positions: Vec<[f64; 2]> = (0..num_agents)
        .map(|_| [rng.random::<f64>(), rng.random::<f64>()])
        .collect();

    let mut out = Vec::with_capacity(frames);
    for _ in 0..frames {
        let mut frame = Frame::empty(max_num_peds);
        for (k, (slot, pos)) in frame.slots_mut().iter_mut().zip(&positions).enumerate() {
            *slot = Slot::new(k as u32 + 1, pos[0], pos[1]);
        }
        out.push(frame);
        for pos in &mut positions {
            pos[0] = (pos[0] + (rng.random::<f64>() - 0.5) * 0.02).clamp(0.0, 1.0);
            pos[1] = (pos[1] + (rng.random::<f64>() - 0.5) * 0.02).clamp(0.0, 1.0);
        }
    }
    Sequence::new(out).expect("crowd scene has at least one frame")
}
