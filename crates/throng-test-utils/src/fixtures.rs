//! Standard hyperparameters and scenes.
//!
//! - [`tiny_config`]: small enough for finite-difference checks.
//! - [`pair_config`]: two slots, one pooling cell, for overfitting tests.
//! - [`straight_line_scene`]: agents moving at constant velocity.
//! - [`converging_pair`]: two agents walking toward each other.

use throng_core::{ModelConfig, Sequence};

use crate::scene;

/// Three slots, a 2×2 grid, and widths of a handful of units.
pub fn tiny_config() -> ModelConfig {
    ModelConfig {
        rnn_size: 3,
        embedding_size: 2,
        grid_size: 2,
        max_num_peds: 3,
        neighborhood_size: 0.6,
        l2_param: 0.01,
    }
}

/// Two slots and a single pooling cell covering the whole unit square.
pub fn pair_config() -> ModelConfig {
    ModelConfig {
        rnn_size: 16,
        embedding_size: 8,
        grid_size: 1,
        max_num_peds: 2,
        neighborhood_size: 2.0,
        l2_param: 0.0,
    }
}

/// `num_agents` pedestrians (ids `1..=num_agents`) walking in parallel
/// straight lines for `frames` frames.
///
/// Agent `k` starts at `(0.1, 0.1 + 0.1·k)` and moves `(0.05, 0.01)`
/// per frame.
pub fn straight_line_scene(num_agents: usize, frames: usize, max_num_peds: usize) -> Sequence {
    let rows: Vec<Vec<(u32, f64, f64)>> = (0..frames)
        .map(|t| {
            (0..num_agents)
                .map(|k| {
                    (
                        k as u32 + 1,
                        0.1 + 0.05 * t as f64,
                        0.1 + 0.1 * k as f64 + 0.01 * t as f64,
                    )
                })
                .collect()
        })
        .collect();
    let refs: Vec<&[(u32, f64, f64)]> = rows.iter().map(Vec::as_slice).collect();
    scene(max_num_peds, &refs)
}

/// Two agents on straight lines over three frames:
/// `(0.1, 0.1) → (0.2, 0.2) → (0.3, 0.3)` and
/// `(0.8, 0.2) → (0.7, 0.3) → (0.6, 0.4)`.
pub fn converging_pair() -> Sequence {
    scene(
        2,
        &[
            &[(1, 0.1, 0.1), (2, 0.8, 0.2)],
            &[(1, 0.2, 0.2), (2, 0.7, 0.3)],
            &[(1, 0.3, 0.3), (2, 0.6, 0.4)],
        ],
    )
}

/// Four frames over three slots with an agent entering late and one
/// leaving early, all within pooling range of each other.
pub fn churn_scene() -> Sequence {
    scene(
        3,
        &[
            &[(1, 0.40, 0.40), (2, 0.55, 0.45)],
            &[(1, 0.43, 0.41), (2, 0.53, 0.47), (3, 0.35, 0.60)],
            &[(1, 0.46, 0.43), (2, 0.51, 0.50), (3, 0.38, 0.57)],
            &[(1, 0.49, 0.44), (0, 0.0, 0.0), (3, 0.41, 0.55)],
        ],
    )
}
