//! Mask building and aggregation together, over whole frames.

use proptest::prelude::*;
use throng_core::{Frame, SceneDimensions, Slot};
use throng_pool::{frame_mask, social_tensor, PoolingGrid};

const H: usize = 3;

fn grid() -> PoolingGrid {
    PoolingGrid {
        neighborhood_size: 1.0,
        grid_size: 2,
        dimensions: SceneDimensions::UNIT,
    }
}

#[test]
fn isolated_agents_see_nothing() {
    let frame = Frame::from_slots(vec![Slot::new(1, 0.0, 0.0), Slot::new(2, 0.9, 0.9)]);
    let mask = frame_mask(&frame, &grid());
    let hidden = vec![1.0; 2 * H];
    let social = social_tensor(&mask, &hidden, H);
    assert!(social.iter().all(|&v| v == 0.0));
}

#[test]
fn mutual_neighbours_exchange_hidden_state() {
    let frame = Frame::from_slots(vec![Slot::new(1, 0.5, 0.5), Slot::new(2, 0.6, 0.4)]);
    let mask = frame_mask(&frame, &grid());
    // Agent 1 is right of and below agent 0: bin 1. Agent 0 is left-above agent 1: bin 2.
    assert_eq!(mask.bin(0, 1), Some(1));
    assert_eq!(mask.bin(1, 0), Some(2));

    let hidden = vec![1.0, 2.0, 3.0, -1.0, -2.0, -3.0];
    let social = social_tensor(&mask, &hidden, H);
    let width = 4 * H;
    assert_eq!(&social[H..2 * H], &[-1.0, -2.0, -3.0]);
    assert_eq!(&social[width + 2 * H..width + 3 * H], &[1.0, 2.0, 3.0]);
}

fn arb_scene() -> impl Strategy<Value = (Vec<Slot>, Vec<f64>, Vec<usize>)> {
    (2usize..7).prop_flat_map(|n| {
        let slots = prop::collection::vec((any::<bool>(), 0.0f64..1.0, 0.0f64..1.0), n)
            .prop_map(|rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (present, x, y))| {
                        if present {
                            Slot::new(i as u32 + 1, x, y)
                        } else {
                            Slot::EMPTY
                        }
                    })
                    .collect::<Vec<_>>()
            });
        let hidden = prop::collection::vec(-1.0f64..1.0, n * H);
        let perm = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
        (slots, hidden, perm)
    })
}

proptest! {
    #[test]
    fn slot_permutation_permutes_social_rows((slots, hidden, perm) in arb_scene()) {
        let n = slots.len();
        let original = social_tensor(&frame_mask(&Frame::from_slots(slots.clone()), &grid()), &hidden, H);

        // Slot k of the permuted frame holds original slot perm[k].
        let permuted_slots: Vec<Slot> = perm.iter().map(|&k| slots[k]).collect();
        let permuted_hidden: Vec<f64> = perm
            .iter()
            .flat_map(|&k| hidden[k * H..(k + 1) * H].iter().copied())
            .collect();
        let permuted = social_tensor(
            &frame_mask(&Frame::from_slots(permuted_slots), &grid()),
            &permuted_hidden,
            H,
        );

        let width = 4 * H;
        for (k, &src) in perm.iter().enumerate() {
            let a = &permuted[k * width..(k + 1) * width];
            let b = &original[src * width..(src + 1) * width];
            for (x, y) in a.iter().zip(b) {
                prop_assert!((x - y).abs() < 1e-12);
            }
        }
        prop_assert_eq!(original.len(), n * width);
    }
}
