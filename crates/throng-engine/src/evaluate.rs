//! Sampling driver: predict every validation trajectory and score it.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use throng_core::Sequence;
use throng_data::DataLoader;
use tracing::{debug, info};

use crate::error::SampleError;
use crate::metrics::{final_displacement_error, mean_displacement_error};
use crate::sampler::Sampler;

/// One scored trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryResult {
    /// Ground truth, `obs_length + pred_length` frames.
    pub truth: Sequence,
    /// Observed frames followed by predicted ones.
    pub predicted: Sequence,
    /// Mean displacement error over the predicted frames.
    pub mean_displacement_error: f64,
    /// Displacement error of the final frame.
    pub final_displacement_error: f64,
}

/// Aggregate of [`evaluate`].
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    /// Every scored trajectory, in loader order.
    pub trajectories: Vec<TrajectoryResult>,
    /// Mean of the per-trajectory MDE.
    pub mean_displacement_error: f64,
    /// Mean of the per-trajectory FDE.
    pub final_displacement_error: f64,
}

/// Sample and score the first sequence of every validation batch.
///
/// The loader should use batch size 1 and
/// `seq_length = obs_length + pred_length`. Draws come from one
/// generator seeded with the sampler's seed, so a run is reproducible.
///
/// # Errors
///
/// [`SampleError::NoTrajectories`] if the loader yields no validation
/// sequence, otherwise any sampling error.
pub fn evaluate(sampler: &Sampler, loader: &mut dyn DataLoader) -> Result<EvaluationReport, SampleError> {
    let obs_length = sampler.config().obs_length;
    let mut rng = ChaCha8Rng::seed_from_u64(sampler.config().seed);
    let mut trajectories = Vec::new();

    loader.reset_batch_pointer(true);
    while let Some(batch) = loader.next_validate_batch() {
        let Some(truth) = batch.input.into_iter().next() else {
            continue;
        };
        let predicted = sampler.sample(&truth, &mut rng)?;
        let mde = mean_displacement_error(&predicted, &truth, obs_length);
        let fde = final_displacement_error(&predicted, &truth, obs_length);
        debug!(
            trajectory = trajectories.len(),
            mde, fde, "sampled trajectory"
        );
        trajectories.push(TrajectoryResult {
            truth,
            predicted,
            mean_displacement_error: mde,
            final_displacement_error: fde,
        });
    }

    if trajectories.is_empty() {
        return Err(SampleError::NoTrajectories);
    }
    let n = trajectories.len() as f64;
    let report = EvaluationReport {
        mean_displacement_error: trajectories
            .iter()
            .map(|t| t.mean_displacement_error)
            .sum::<f64>()
            / n,
        final_displacement_error: trajectories
            .iter()
            .map(|t| t.final_displacement_error)
            .sum::<f64>()
            / n,
        trajectories,
    };
    info!(
        trajectories = report.trajectories.len(),
        mde = report.mean_displacement_error,
        fde = report.final_displacement_error,
        "evaluation complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SampleConfig, SampleMode};
    use throng_core::SceneDimensions;
    use throng_data::{LoaderConfig, SequenceLoader};
    use throng_model::SocialLstm;
    use throng_test_utils::fixtures::{churn_scene, straight_line_scene, tiny_config};

    fn sampler(seed: u64) -> Sampler {
        let model = SocialLstm::new(tiny_config(), 2).unwrap();
        let config = SampleConfig {
            obs_length: 2,
            pred_length: 1,
            seed,
            mode: SampleMode::Stochastic,
        };
        Sampler::new(model, config, SceneDimensions::UNIT).unwrap()
    }

    fn loader(validation_fraction: f64) -> SequenceLoader {
        // Windows hold seq_length + 1 = 4 frames; evaluation reads the
        // first 3 (the input half of each pair).
        let windows = vec![churn_scene(), straight_line_scene(3, 4, 3), churn_scene()];
        SequenceLoader::new(
            vec![windows],
            LoaderConfig {
                seq_length: 3,
                batch_size: 1,
                max_num_peds: 3,
                validation_fraction,
                seed: 0,
            },
        )
        .unwrap()
    }

    #[test]
    fn scores_every_validation_trajectory() {
        let report = evaluate(&sampler(3), &mut loader(1.0)).unwrap();
        assert_eq!(report.trajectories.len(), 3);
        for t in &report.trajectories {
            assert_eq!(t.predicted.len(), 3);
            assert_eq!(t.truth.len(), 3);
            assert!(t.mean_displacement_error >= 0.0);
            // One predicted frame: MDE and FDE coincide.
            assert_eq!(t.mean_displacement_error, t.final_displacement_error);
        }
        let mean = report
            .trajectories
            .iter()
            .map(|t| t.mean_displacement_error)
            .sum::<f64>()
            / 3.0;
        assert!((report.mean_displacement_error - mean).abs() < 1e-15);
    }

    #[test]
    fn reproducible_for_a_seed() {
        let a = evaluate(&sampler(5), &mut loader(1.0)).unwrap();
        let b = evaluate(&sampler(5), &mut loader(1.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn no_validation_data_is_an_error() {
        assert!(matches!(
            evaluate(&sampler(0), &mut loader(0.0)),
            Err(SampleError::NoTrajectories)
        ));
    }
}
