//! Dense kernels over row-major `[rows, cols]` buffers.
//!
//! Every kernel accumulates into its output, so callers zero or seed
//! the destination first.

/// `out[c] += Σ_r x[r] · w[r, c]`.
pub fn vec_mat_acc(x: &[f64], w: &[f64], cols: usize, out: &mut [f64]) {
    debug_assert_eq!(w.len(), x.len() * cols);
    debug_assert_eq!(out.len(), cols);
    for (r, &xr) in x.iter().enumerate() {
        // Social tensors are mostly zero.
        if xr == 0.0 {
            continue;
        }
        let row = &w[r * cols..(r + 1) * cols];
        for (o, &wv) in out.iter_mut().zip(row) {
            *o += xr * wv;
        }
    }
}

/// `dx[r] += Σ_c w[r, c] · dy[c]`.
pub fn mat_vec_acc(w: &[f64], cols: usize, dy: &[f64], dx: &mut [f64]) {
    debug_assert_eq!(w.len(), dx.len() * cols);
    debug_assert_eq!(dy.len(), cols);
    for (r, d) in dx.iter_mut().enumerate() {
        let row = &w[r * cols..(r + 1) * cols];
        *d += row.iter().zip(dy).map(|(a, b)| a * b).sum::<f64>();
    }
}

/// `dw[r, c] += x[r] · dy[c]`.
pub fn outer_acc(x: &[f64], dy: &[f64], dw: &mut [f64]) {
    let cols = dy.len();
    debug_assert_eq!(dw.len(), x.len() * cols);
    for (r, &xr) in x.iter().enumerate() {
        if xr == 0.0 {
            continue;
        }
        let row = &mut dw[r * cols..(r + 1) * cols];
        for (d, &g) in row.iter_mut().zip(dy) {
            *d += xr * g;
        }
    }
}

/// `dst += src`, element-wise.
pub fn add_assign(dst: &mut [f64], src: &[f64]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d += s;
    }
}

/// Logistic sigmoid.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    // w = [[1, 2, 3], [4, 5, 6]]
    const W: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

    #[test]
    fn vec_mat_multiplies_rows() {
        let mut out = vec![1.0; 3];
        vec_mat_acc(&[1.0, -1.0], &W, 3, &mut out);
        assert_eq!(out, vec![-2.0, -2.0, -2.0]);
    }

    #[test]
    fn mat_vec_is_transpose_product() {
        let mut dx = vec![0.0; 2];
        mat_vec_acc(&W, 3, &[1.0, 0.0, 1.0], &mut dx);
        assert_eq!(dx, vec![4.0, 10.0]);
    }

    #[test]
    fn outer_accumulates() {
        let mut dw = vec![1.0; 6];
        outer_acc(&[2.0, 0.0], &[1.0, 2.0, 3.0], &mut dw);
        assert_eq!(dw, vec![3.0, 5.0, 7.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn sigmoid_midpoint_and_tails() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-40.0) < 1e-6);
    }
}
