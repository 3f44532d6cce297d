//! Displacement error metrics.
//!
//! For every predicted frame the error is the mean Euclidean distance
//! between true and predicted positions over the counted slots. A slot
//! is counted when it is occupied in both the truth and the prediction
//! and its true position lies inside `[0, 1]²`. A frame with no counted
//! slot scores 0 and still enters the mean.

use throng_core::{Frame, Sequence};

/// Per-frame errors for frames `obs_length..` of the shorter sequence.
pub fn displacement_errors(predicted: &Sequence, truth: &Sequence, obs_length: usize) -> Vec<f64> {
    let end = predicted.len().min(truth.len());
    (obs_length..end)
        .map(|t| frame_error(&predicted.frames()[t], &truth.frames()[t]))
        .collect()
}

/// Mean displacement error over the predicted frames; 0.0 if there are
/// none.
pub fn mean_displacement_error(predicted: &Sequence, truth: &Sequence, obs_length: usize) -> f64 {
    let errors = displacement_errors(predicted, truth, obs_length);
    if errors.is_empty() {
        return 0.0;
    }
    errors.iter().sum::<f64>() / errors.len() as f64
}

/// Displacement error of the final predicted frame; 0.0 if there is
/// no predicted frame.
pub fn final_displacement_error(predicted: &Sequence, truth: &Sequence, obs_length: usize) -> f64 {
    let end = predicted.len().min(truth.len());
    if end <= obs_length {
        return 0.0;
    }
    frame_error(&predicted.frames()[end - 1], &truth.frames()[end - 1])
}

fn frame_error(predicted: &Frame, truth: &Frame) -> f64 {
    let mut total = 0.0;
    let mut counted = 0usize;
    for (p, t) in predicted.slots().iter().zip(truth.slots()) {
        if !t.exists() || !p.exists() {
            continue;
        }
        if !(0.0..=1.0).contains(&t.x) || !(0.0..=1.0).contains(&t.y) {
            continue;
        }
        total += (t.x - p.x).hypot(t.y - p.y);
        counted += 1;
    }
    if counted == 0 {
        0.0
    } else {
        total / counted as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use throng_test_utils::scene;

    #[test]
    fn averages_over_counted_slots_and_frames() {
        let truth = scene(
            2,
            &[
                &[(1, 0.1, 0.1), (2, 0.5, 0.5)],
                &[(1, 0.2, 0.2), (2, 0.6, 0.6)],
                &[(1, 0.3, 0.3), (2, 0.7, 0.7)],
            ],
        );
        let predicted = scene(
            2,
            &[
                &[(1, 0.1, 0.1), (2, 0.5, 0.5)],
                &[(1, 0.2, 0.5), (2, 0.6, 0.7)],
                &[(1, 0.3, 0.3), (2, 1.0, 1.0)],
            ],
        );
        let errors = displacement_errors(&predicted, &truth, 1);
        assert_eq!(errors.len(), 2);
        assert!((errors[0] - (0.3 + 0.1) / 2.0).abs() < 1e-12);
        assert!((errors[1] - 0.18f64.sqrt() / 2.0).abs() < 1e-12);
        let mde = mean_displacement_error(&predicted, &truth, 1);
        assert!((mde - (errors[0] + errors[1]) / 2.0).abs() < 1e-12);
        assert_eq!(final_displacement_error(&predicted, &truth, 1), errors[1]);
    }

    #[test]
    fn uncounted_slots_skipped_and_empty_frames_score_zero() {
        // Slot 1 is absent from the prediction; slot 2 is outside the unit square.
        let truth = scene(
            3,
            &[
                &[(1, 0.1, 0.1)],
                &[(1, 0.2, 0.2), (2, 0.4, 0.4), (3, 1.5, 0.4)],
                &[(0, 0.0, 0.0), (2, 0.5, 0.5)],
            ],
        );
        let predicted = scene(
            3,
            &[
                &[(1, 0.1, 0.1)],
                &[(1, 0.2, 0.3), (0, 0.0, 0.0), (3, 0.0, 0.0)],
                &[(1, 0.5, 0.5)],
            ],
        );
        let errors = displacement_errors(&predicted, &truth, 1);
        assert!((errors[0] - 0.1).abs() < 1e-12);
        // Frame 2: truth slot 0 empty, prediction slot 1 empty.
        assert_eq!(errors[1], 0.0);
        assert!((mean_displacement_error(&predicted, &truth, 1) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn nothing_predicted() {
        let truth = scene(1, &[&[(1, 0.1, 0.1)], &[(1, 0.2, 0.2)]]);
        assert!(displacement_errors(&truth, &truth, 2).is_empty());
        assert_eq!(mean_displacement_error(&truth, &truth, 2), 0.0);
        assert_eq!(final_displacement_error(&truth, &truth, 5), 0.0);
    }

    fn two_agent_scene(positions: &[[(f64, f64); 2]]) -> Sequence {
        let rows: Vec<Vec<(u32, f64, f64)>> = positions
            .iter()
            .map(|f| vec![(1, f[0].0, f[0].1), (2, f[1].0, f[1].1)])
            .collect();
        let frames: Vec<&[(u32, f64, f64)]> = rows.iter().map(Vec::as_slice).collect();
        scene(2, &frames)
    }

    proptest::proptest! {
        #[test]
        fn errors_are_bounded_and_vanish_on_truth(
            truth in proptest::collection::vec(proptest::array::uniform2((0.0..=1.0f64, 0.0..=1.0f64)), 2..6),
            noise in proptest::collection::vec(proptest::array::uniform2((-1.0..1.0f64, -1.0..1.0f64)), 6),
        ) {
            let truth_seq = two_agent_scene(&truth);
            let shifted: Vec<[(f64, f64); 2]> = truth
                .iter()
                .zip(&noise)
                .map(|(f, n)| [(f[0].0 + n[0].0, f[0].1 + n[0].1), (f[1].0 + n[1].0, f[1].1 + n[1].1)])
                .collect();
            let predicted = two_agent_scene(&shifted);

            proptest::prop_assert_eq!(mean_displacement_error(&truth_seq, &truth_seq, 1), 0.0);
            let errors = displacement_errors(&predicted, &truth_seq, 1);
            proptest::prop_assert_eq!(errors.len(), truth.len() - 1);
            let mde = mean_displacement_error(&predicted, &truth_seq, 1);
            let max = errors.iter().cloned().fold(0.0, f64::max);
            proptest::prop_assert!(mde >= 0.0 && mde <= max + 1e-12);
            proptest::prop_assert!(max <= 2f64.sqrt() * 2.0);
        }
    }
}
