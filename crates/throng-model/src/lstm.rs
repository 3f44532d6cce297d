//! Basic LSTM cell, forward and backward.
//!
//! Gate pre-activations are `[x, h_prev]·W + b`, laid out as four
//! `H`-wide column blocks `i, j, f, o`:
//!
//! ```text
//! c = c_prev·σ(f + 1) + σ(i)·tanh(j)
//! h = tanh(c)·σ(o)
//! ```

use crate::linalg::{mat_vec_acc, outer_acc, sigmoid, vec_mat_acc};

/// Constant added to the forget gate pre-activation.
pub const FORGET_BIAS: f64 = 1.0;

/// Activations kept from the forward pass of one cell step.
#[derive(Clone, Debug, PartialEq)]
pub struct LstmCache {
    /// Activated gates `[σ(i), tanh(j), σ(f + 1), σ(o)]`, each `H` wide.
    pub gates: Vec<f64>,
    /// New cell state.
    pub cell: Vec<f64>,
    /// `tanh` of the new cell state.
    pub tanh_cell: Vec<f64>,
    /// New hidden state.
    pub hidden: Vec<f64>,
}

/// One cell step. `xh` is the concatenation `[x, h_prev]`.
pub fn forward(w: &[f64], b: &[f64], xh: &[f64], c_prev: &[f64], rnn_size: usize) -> LstmCache {
    let h = rnn_size;
    let mut pre = b.to_vec();
    vec_mat_acc(xh, w, 4 * h, &mut pre);

    let mut gates = vec![0.0; 4 * h];
    let mut cell = vec![0.0; h];
    let mut tanh_cell = vec![0.0; h];
    let mut hidden = vec![0.0; h];
    for k in 0..h {
        let si = sigmoid(pre[k]);
        let tj = pre[h + k].tanh();
        let sf = sigmoid(pre[2 * h + k] + FORGET_BIAS);
        let so = sigmoid(pre[3 * h + k]);
        gates[k] = si;
        gates[h + k] = tj;
        gates[2 * h + k] = sf;
        gates[3 * h + k] = so;

        cell[k] = c_prev[k] * sf + si * tj;
        tanh_cell[k] = cell[k].tanh();
        hidden[k] = tanh_cell[k] * so;
    }
    LstmCache {
        gates,
        cell,
        tanh_cell,
        hidden,
    }
}

/// Backward through one cell step.
///
/// `dh` and `dc` are the gradients arriving at the step's hidden and cell
/// outputs. Accumulates into `dw`, `db` and `dxh` (the gradient with
/// respect to `[x, h_prev]`), and returns the gradient with respect to
/// `c_prev`.
#[allow(clippy::too_many_arguments)]
pub fn backward(
    w: &[f64],
    cache: &LstmCache,
    xh: &[f64],
    c_prev: &[f64],
    dh: &[f64],
    dc: &[f64],
    dw: &mut [f64],
    db: &mut [f64],
    dxh: &mut [f64],
) -> Vec<f64> {
    let h = dh.len();
    let mut dgates = vec![0.0; 4 * h];
    let mut dc_prev = vec![0.0; h];
    for k in 0..h {
        let si = cache.gates[k];
        let tj = cache.gates[h + k];
        let sf = cache.gates[2 * h + k];
        let so = cache.gates[3 * h + k];
        let tc = cache.tanh_cell[k];

        let dc_total = dc[k] + dh[k] * so * (1.0 - tc * tc);
        dgates[k] = dc_total * tj * si * (1.0 - si);
        dgates[h + k] = dc_total * si * (1.0 - tj * tj);
        dgates[2 * h + k] = dc_total * c_prev[k] * sf * (1.0 - sf);
        dgates[3 * h + k] = dh[k] * tc * so * (1.0 - so);
        dc_prev[k] = dc_total * sf;
    }

    crate::linalg::add_assign(db, &dgates);
    outer_acc(xh, &dgates, dw);
    mat_vec_acc(w, 4 * h, &dgates, dxh);
    dc_prev
}

#[cfg(test)]
mod tests {
    use super::*;

    // x width 2, H = 2.
    fn weights() -> (Vec<f64>, Vec<f64>) {
        let w: Vec<f64> = (0..4 * 8).map(|k| ((k as f64) * 0.37).sin() * 0.5).collect();
        let b: Vec<f64> = (0..8).map(|k| (k as f64 - 4.0) * 0.05).collect();
        (w, b)
    }

    fn objective(w: &[f64], b: &[f64], xh: &[f64], c_prev: &[f64]) -> f64 {
        let cache = forward(w, b, xh, c_prev, 2);
        // Weighted sum of both outputs so h and c paths are exercised.
        cache.hidden[0] * 0.7 - cache.hidden[1] * 1.3 + cache.cell[0] * 0.4 + cache.cell[1] * 0.9
    }

    #[test]
    fn zero_input_keeps_forget_scaled_cell() {
        let w = vec![0.0; 4 * 8];
        let b = vec![0.0; 8];
        let cache = forward(&w, &b, &[0.0; 4], &[1.0, -2.0], 2);
        let sf = sigmoid(1.0);
        assert!((cache.cell[0] - sf).abs() < 1e-15);
        assert!((cache.cell[1] + 2.0 * sf).abs() < 1e-15);
        assert!((cache.hidden[0] - 0.5 * sf.tanh()).abs() < 1e-15);
    }

    #[test]
    fn backward_matches_finite_differences() {
        let (w, b) = weights();
        let xh = [0.3, -0.8, 0.1, 0.5];
        let c_prev = [0.2, -0.4];

        let cache = forward(&w, &b, &xh, &c_prev, 2);
        let mut dw = vec![0.0; w.len()];
        let mut db = vec![0.0; b.len()];
        let mut dxh = vec![0.0; xh.len()];
        let dc_prev = backward(
            &w,
            &cache,
            &xh,
            &c_prev,
            &[0.7, -1.3],
            &[0.4, 0.9],
            &mut dw,
            &mut db,
            &mut dxh,
        );

        let eps = 1e-6;
        let check = |analytic: f64, plus: f64, minus: f64| {
            let numeric = (plus - minus) / (2.0 * eps);
            assert!((analytic - numeric).abs() < 1e-7, "{analytic} vs {numeric}");
        };
        for k in 0..w.len() {
            let (mut wp, mut wm) = (w.clone(), w.clone());
            wp[k] += eps;
            wm[k] -= eps;
            check(dw[k], objective(&wp, &b, &xh, &c_prev), objective(&wm, &b, &xh, &c_prev));
        }
        for k in 0..b.len() {
            let (mut bp, mut bm) = (b.clone(), b.clone());
            bp[k] += eps;
            bm[k] -= eps;
            check(db[k], objective(&w, &bp, &xh, &c_prev), objective(&w, &bm, &xh, &c_prev));
        }
        for k in 0..xh.len() {
            let (mut xp, mut xm) = (xh, xh);
            xp[k] += eps;
            xm[k] -= eps;
            check(dxh[k], objective(&w, &b, &xp, &c_prev), objective(&w, &b, &xm, &c_prev));
        }
        for k in 0..2 {
            let (mut cp, mut cm) = (c_prev, c_prev);
            cp[k] += eps;
            cm[k] -= eps;
            check(dc_prev[k], objective(&w, &b, &xh, &cp), objective(&w, &b, &xh, &cm));
        }
    }
}
