//! Social tensor aggregation.
//!
//! `social[i][b·H..(b+1)·H] = Σ_j mask[i, j, b] · hidden[j]`, where `hidden`
//! is the row-major `[N, H]` previous-step hidden state. The tensor is
//! computed for all agents from the same hidden state before any agent
//! is advanced.

use crate::mask::GridMask;

/// Aggregate neighbor hidden states into a flat `[N, G²·H]` tensor.
///
/// `hidden` must hold `mask.num_peds() * rnn_size` values.
pub fn social_tensor(mask: &GridMask, hidden: &[f64], rnn_size: usize) -> Vec<f64> {
    let n = mask.num_peds();
    let width = mask.cells() * rnn_size;
    debug_assert_eq!(hidden.len(), n * rnn_size);

    let mut out = vec![0.0; n * width];
    for agent in 0..n {
        let row = &mut out[agent * width..(agent + 1) * width];
        for (neighbour, bin, weight) in mask.entries(agent) {
            let h = &hidden[neighbour * rnn_size..(neighbour + 1) * rnn_size];
            let dst = &mut row[bin * rnn_size..(bin + 1) * rnn_size];
            for (d, &v) in dst.iter_mut().zip(h) {
                *d += weight * v;
            }
        }
    }
    out
}

/// Adjoint of [`social_tensor`].
///
/// Accumulates `d_hidden[j] += Σ_{i,b} mask[i, j, b] · d_social[i][b]`
/// into `d_hidden` (`[N, H]`).
pub fn social_tensor_backward(
    mask: &GridMask,
    d_social: &[f64],
    rnn_size: usize,
    d_hidden: &mut [f64],
) {
    let n = mask.num_peds();
    let width = mask.cells() * rnn_size;
    debug_assert_eq!(d_social.len(), n * width);
    debug_assert_eq!(d_hidden.len(), n * rnn_size);

    for agent in 0..n {
        let row = &d_social[agent * width..(agent + 1) * width];
        for (neighbour, bin, weight) in mask.entries(agent) {
            let src = &row[bin * rnn_size..(bin + 1) * rnn_size];
            let dst = &mut d_hidden[neighbour * rnn_size..(neighbour + 1) * rnn_size];
            for (d, &g) in dst.iter_mut().zip(src) {
                *d += weight * g;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hidden_rows(rows: &[&[f64]]) -> Vec<f64> {
        rows.iter().flat_map(|r| r.iter().copied()).collect()
    }

    #[test]
    fn neighbours_in_same_bin_are_summed() {
        // 3 agents, G = 2, H = 2. Agents 1 and 2 both sit in bin 3 of agent 0.
        let mut mask = GridMask::zeros(3, 2);
        mask.set(0, 1, 3, 1.0);
        mask.set(0, 2, 3, 1.0);
        mask.set(1, 0, 0, 1.0);
        let hidden = hidden_rows(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]);

        let social = social_tensor(&mask, &hidden, 2);
        assert_eq!(social.len(), 3 * 4 * 2);
        assert_eq!(&social[0..8], &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 8.0, 10.0]);
        assert_eq!(&social[8..16], &[1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(social[16..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_mask_gives_zero_tensor() {
        let mask = GridMask::zeros(4, 3);
        let hidden = vec![1.0; 4 * 5];
        assert!(social_tensor(&mask, &hidden, 5).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn backward_routes_gradient_to_neighbours() {
        let mut mask = GridMask::zeros(2, 1);
        mask.set(0, 1, 0, 1.0);
        let d_social = vec![0.5, -1.0, 9.0, 9.0];
        let mut d_hidden = vec![0.0; 4];
        social_tensor_backward(&mask, &d_social, 2, &mut d_hidden);
        assert_eq!(d_hidden, vec![0.0, 0.0, 0.5, -1.0]);
    }

    fn arb_mask(n: usize, g: usize) -> impl Strategy<Value = GridMask> {
        prop::collection::vec(prop::option::of(0..g * g), n * n).prop_map(move |bins| {
            let mut mask = GridMask::zeros(n, g);
            for (k, bin) in bins.into_iter().enumerate() {
                let (i, j) = (k / n, k % n);
                if let (Some(b), true) = (bin, i != j) {
                    mask.set(i, j, b, 1.0);
                }
            }
            mask
        })
    }

    proptest! {
        #[test]
        fn backward_is_adjoint_of_forward(
            mask in arb_mask(4, 2),
            hidden in prop::collection::vec(-1.0f64..1.0, 4 * 3),
            upstream in prop::collection::vec(-1.0f64..1.0, 4 * 4 * 3),
        ) {
            // <upstream, S(h)> == <S^T(upstream), h>
            let social = social_tensor(&mask, &hidden, 3);
            let lhs: f64 = social.iter().zip(&upstream).map(|(a, b)| a * b).sum();
            let mut d_hidden = vec![0.0; hidden.len()];
            social_tensor_backward(&mask, &upstream, 3, &mut d_hidden);
            let rhs: f64 = d_hidden.iter().zip(&hidden).map(|(a, b)| a * b).sum();
            prop_assert!((lhs - rhs).abs() < 1e-9);
        }

        #[test]
        fn aggregation_is_linear_in_hidden(
            mask in arb_mask(3, 2),
            a in prop::collection::vec(-1.0f64..1.0, 3 * 2),
            b in prop::collection::vec(-1.0f64..1.0, 3 * 2),
        ) {
            let sum: Vec<f64> = a.iter().zip(&b).map(|(x, y)| x + y).collect();
            let sa = social_tensor(&mask, &a, 2);
            let sb = social_tensor(&mask, &b, 2);
            let ssum = social_tensor(&mask, &sum, 2);
            for k in 0..ssum.len() {
                prop_assert!((ssum[k] - sa[k] - sb[k]).abs() < 1e-12);
            }
        }
    }
}
