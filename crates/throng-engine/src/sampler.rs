//! Autoregressive trajectory sampler.
//!
//! Sampling is a three-phase state machine driven by an explicit loop:
//!
//! - **Observing**: every observed frame except the last is fed with
//!   its true positions and grid mask; outputs are discarded.
//! - **Predicting**: starting from the last observed frame, each step
//!   builds the mask from the previous positions, runs one recurrent
//!   step, and places every agent present in the last observed frame
//!   at a position drawn from (or at the mean of) its distribution.
//!   The new frame is the next step's input.
//! - **Done**: after `pred_length` predicted frames.
//!
//! Slots empty in the last observed frame stay empty throughout the
//! prediction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use throng_checkpoint::CheckpointStore;
use throng_core::{Frame, SceneDimensions, Sequence, Slot};
use throng_model::{Gaussian2d, RecurrentState, SocialLstm};
use throng_pool::{frame_mask, PoolingGrid};
use tracing::debug;

use crate::config::{SampleConfig, SampleMode};
use crate::error::SampleError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Observing { next: usize },
    Predicting { remaining: usize },
    Done,
}

// Threaded by value through `advance`.
struct Rollout {
    phase: Phase,
    previous: Frame,
    recurrent: RecurrentState,
    frames: Vec<Frame>,
}

/// Rolls a trained model forward from an observed prefix.
#[derive(Clone, Debug)]
pub struct Sampler {
    model: SocialLstm,
    grid: PoolingGrid,
    config: SampleConfig,
}

impl Sampler {
    /// A sampler over `model`.
    ///
    /// # Errors
    ///
    /// [`SampleError::Config`] if `config` or `dimensions` fails
    /// validation.
    pub fn new(
        model: SocialLstm,
        config: SampleConfig,
        dimensions: SceneDimensions,
    ) -> Result<Self, SampleError> {
        config.validate()?;
        dimensions.validate()?;
        let grid = PoolingGrid::from_config(model.config(), dimensions);
        Ok(Self {
            model,
            grid,
            config,
        })
    }

    /// Load the model saved for `epoch` (the latest for `None`).
    ///
    /// # Errors
    ///
    /// [`SampleError::Checkpoint`] if no such checkpoint exists or it
    /// cannot be read, otherwise as [`new`](Self::new).
    pub fn from_checkpoint(
        store: &CheckpointStore,
        epoch: Option<u32>,
        config: SampleConfig,
        dimensions: SceneDimensions,
    ) -> Result<Self, SampleError> {
        let ckpt = store.load(epoch)?;
        debug!(
            epoch = ckpt.meta.epoch,
            train_loss = ckpt.meta.train_loss,
            "sampling from checkpoint"
        );
        let model = ckpt.into_model()?;
        Self::new(model, config, dimensions)
    }

    /// The underlying model.
    pub fn model(&self) -> &SocialLstm {
        &self.model
    }

    /// Sampling settings.
    pub fn config(&self) -> &SampleConfig {
        &self.config
    }

    /// Sample with a generator seeded from the configured seed.
    ///
    /// # Errors
    ///
    /// As [`sample`](Self::sample).
    pub fn sample_seeded(&self, observed: &Sequence) -> Result<Sequence, SampleError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.sample(observed, &mut rng)
    }

    /// Predict `pred_length` frames after the first `obs_length` frames
    /// of `observed`.
    ///
    /// Returns the observed frames followed by the predicted ones.
    ///
    /// # Errors
    ///
    /// [`SampleError::ObservationTooShort`] if `observed` has fewer than
    /// `obs_length` frames, [`SampleError::Model`] on a shape mismatch.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        observed: &Sequence,
        rng: &mut R,
    ) -> Result<Sequence, SampleError> {
        let obs_length = self.config.obs_length;
        if observed.len() < obs_length {
            return Err(SampleError::ObservationTooShort {
                frames: observed.len(),
                needed: obs_length,
            });
        }
        observed.check_capacity(self.model.config().max_num_peds)?;

        let observed = &observed.frames()[..obs_length];
        let mut rollout = Rollout {
            phase: Phase::Observing { next: 0 },
            previous: observed[0].clone(),
            recurrent: self.model.initial_state(),
            frames: Vec::with_capacity(self.config.total_length()),
        };
        rollout.frames.extend_from_slice(observed);

        while rollout.phase != Phase::Done {
            rollout = self.advance(rollout, observed, rng)?;
        }
        Ok(Sequence::new(rollout.frames)?)
    }

    fn advance<R: Rng + ?Sized>(
        &self,
        rollout: Rollout,
        observed: &[Frame],
        rng: &mut R,
    ) -> Result<Rollout, SampleError> {
        let Rollout {
            phase,
            previous,
            recurrent,
            mut frames,
        } = rollout;

        match phase {
            Phase::Observing { next } if next + 1 < observed.len() => {
                let frame = &observed[next];
                let mask = frame_mask(frame, &self.grid);
                let out = self.model.step(frame, &mask, &recurrent)?;
                Ok(Rollout {
                    phase: Phase::Observing { next: next + 1 },
                    previous: frame.clone(),
                    recurrent: out.state,
                    frames,
                })
            }
            Phase::Observing { .. } => {
                let seed = observed[observed.len() - 1].clone();
                Ok(Rollout {
                    phase: Phase::Predicting {
                        remaining: self.config.pred_length,
                    },
                    previous: seed,
                    recurrent,
                    frames,
                })
            }
            Phase::Predicting { remaining } => {
                let mask = frame_mask(&previous, &self.grid);
                let out = self.model.step(&previous, &mask, &recurrent)?;
                let next = self.place(&previous, &out.distributions, rng);
                frames.push(next.clone());
                let phase = if remaining > 1 {
                    Phase::Predicting {
                        remaining: remaining - 1,
                    }
                } else {
                    Phase::Done
                };
                Ok(Rollout {
                    phase,
                    previous: next,
                    recurrent: out.state,
                    frames,
                })
            }
            Phase::Done => Ok(Rollout {
                phase,
                previous,
                recurrent,
                frames,
            }),
        }
    }

    fn place<R: Rng + ?Sized>(
        &self,
        previous: &Frame,
        distributions: &[Gaussian2d],
        rng: &mut R,
    ) -> Frame {
        let slots = previous
            .slots()
            .iter()
            .zip(distributions)
            .map(|(slot, dist)| {
                if !slot.exists() {
                    return Slot::EMPTY;
                }
                let [x, y] = match self.config.mode {
                    SampleMode::Stochastic => dist.sample(rng),
                    SampleMode::Mean => dist.mean(),
                };
                Slot { id: slot.id, x, y }
            })
            .collect();
        Frame::from_slots(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use throng_test_utils::fixtures::{churn_scene, straight_line_scene, tiny_config};

    fn sampler(mode: SampleMode, obs: usize, pred: usize) -> Sampler {
        let model = SocialLstm::new(tiny_config(), 4).unwrap();
        let config = SampleConfig {
            obs_length: obs,
            pred_length: pred,
            seed: 9,
            mode,
        };
        Sampler::new(model, config, SceneDimensions::UNIT).unwrap()
    }

    #[test]
    fn degenerate_scene_dimensions_rejected() {
        let model = SocialLstm::new(tiny_config(), 4).unwrap();
        let dims = SceneDimensions::new(640.0, f64::NAN);
        assert!(matches!(
            Sampler::new(model, SampleConfig::default(), dims),
            Err(SampleError::Config(_))
        ));
    }

    #[test]
    fn output_keeps_observation_and_appends_prediction() {
        let s = sampler(SampleMode::Stochastic, 3, 4);
        let observed = straight_line_scene(2, 5, 3);
        let out = s.sample_seeded(&observed).unwrap();
        assert_eq!(out.len(), 7);
        assert_eq!(&out.frames()[..3], &observed.frames()[..3]);
        for frame in &out.frames()[3..] {
            assert_eq!(frame.active_count(), 2);
            assert_eq!(frame.slots()[0].id, observed.frames()[2].slots()[0].id);
            assert!(frame.slots()[0].x.is_finite());
        }
    }

    #[test]
    fn same_seed_reproduces_bit_for_bit() {
        let s = sampler(SampleMode::Stochastic, 2, 5);
        let observed = churn_scene();
        let a = s.sample_seeded(&observed).unwrap();
        let b = s.sample_seeded(&observed).unwrap();
        assert_eq!(a.to_array(), b.to_array());

        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let c = s.sample(&observed, &mut rng).unwrap();
        assert_ne!(a.to_array(), c.to_array());
    }

    #[test]
    fn agents_absent_from_last_observed_frame_stay_empty() {
        // Slot 1 is vacated in the last frame of the churn scene.
        let observed = churn_scene();
        let last = &observed.frames()[3];
        assert!(!last.slots()[1].exists());
        let s = sampler(SampleMode::Stochastic, 4, 3);
        let out = s.sample_seeded(&observed).unwrap();
        assert_eq!(out.len(), 7);
        for frame in &out.frames()[4..] {
            for (k, slot) in frame.slots().iter().enumerate() {
                assert_eq!(slot.exists(), last.slots()[k].exists());
                if !slot.exists() {
                    assert_eq!(*slot, Slot::EMPTY);
                }
            }
        }
    }

    #[test]
    fn mean_mode_needs_no_randomness() {
        let s = sampler(SampleMode::Mean, 2, 3);
        let observed = churn_scene();
        let mut a = ChaCha8Rng::seed_from_u64(1);
        let mut b = ChaCha8Rng::seed_from_u64(2);
        assert_eq!(
            s.sample(&observed, &mut a).unwrap(),
            s.sample(&observed, &mut b).unwrap()
        );
    }

    #[test]
    fn mean_mode_matches_manual_rollout() {
        let s = sampler(SampleMode::Mean, 2, 1);
        let observed = churn_scene();
        let model = s.model();
        let grid = PoolingGrid::from_config(model.config(), SceneDimensions::UNIT);

        let f0 = &observed.frames()[0];
        let f1 = &observed.frames()[1];
        let st = model.step(f0, &frame_mask(f0, &grid), &model.initial_state()).unwrap();
        let out = model.step(f1, &frame_mask(f1, &grid), &st.state).unwrap();

        let sampled = s.sample_seeded(&observed).unwrap();
        let predicted = &sampled.frames()[2];
        for k in f1.active_slots() {
            assert_eq!(predicted.slots()[k].position(), out.distributions[k].mean());
        }
    }

    #[test]
    fn short_observation_rejected() {
        let s = sampler(SampleMode::Mean, 6, 2);
        assert!(matches!(
            s.sample_seeded(&churn_scene()),
            Err(SampleError::ObservationTooShort {
                frames: 4,
                needed: 6
            })
        ));
    }
}
