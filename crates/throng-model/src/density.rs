//! Bivariate Gaussian output head.
//!
//! The head emits five raw values `z`. They map onto a distribution as
//! `μx = z0`, `μy = z1`, `σx = exp(z2)`, `σy = exp(z3)`, `ρ = tanh(z4)`,
//! which keeps `σ > 0` and `|ρ| < 1` by construction.
//!
//! The negative log-likelihood is clamped at `-ln(PDF_EPSILON)`: a
//! density below the floor contributes that constant and no gradient.

use std::f64::consts::PI;

use rand::Rng;
use throng_core::OUTPUT_SIZE;

/// Density floor applied before taking the logarithm.
pub const PDF_EPSILON: f64 = 1e-20;

/// Standard normal draw (Box-Muller, cosine branch).
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    standard_normal_pair(rng)[0]
}

/// Two independent standard normal draws from one Box-Muller transform.
pub fn standard_normal_pair<R: Rng + ?Sized>(rng: &mut R) -> [f64; 2] {
    let u1: f64 = rng.random::<f64>().max(1e-300);
    let u2: f64 = rng.random();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * PI * u2;
    [r * theta.cos(), r * theta.sin()]
}

/// Parameters of one bivariate normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gaussian2d {
    /// Mean x.
    pub mux: f64,
    /// Mean y.
    pub muy: f64,
    /// Standard deviation in x, always > 0.
    pub sx: f64,
    /// Standard deviation in y, always > 0.
    pub sy: f64,
    /// Correlation, always in `(-1, 1)`.
    pub rho: f64,
}

impl Gaussian2d {
    /// Map the five raw head outputs onto a distribution.
    pub fn from_raw(z: &[f64; OUTPUT_SIZE]) -> Self {
        Self {
            mux: z[0],
            muy: z[1],
            sx: z[2].exp(),
            sy: z[3].exp(),
            rho: z[4].tanh(),
        }
    }

    /// Distribution mean `[μx, μy]`.
    pub fn mean(&self) -> [f64; 2] {
        [self.mux, self.muy]
    }

    /// Probability density at `(x, y)`.
    pub fn pdf(&self, x: f64, y: f64) -> f64 {
        (-self.neg_log_pdf(x, y)).exp()
    }

    // Unclamped.
    fn neg_log_pdf(&self, x: f64, y: f64) -> f64 {
        let q = 1.0 - self.rho * self.rho;
        let a = (x - self.mux) / self.sx;
        let b = (y - self.muy) / self.sy;
        let z = a * a + b * b - 2.0 * self.rho * a * b;
        z / (2.0 * q) + (2.0 * PI * self.sx * self.sy * q.sqrt()).ln()
    }

    /// `-ln(max(pdf, ε))`.
    pub fn nll(&self, x: f64, y: f64) -> f64 {
        self.neg_log_pdf(x, y).min(-PDF_EPSILON.ln())
    }

    /// Clamped negative log-likelihood and its gradient with respect to
    /// the raw head outputs.
    pub fn nll_with_grad(&self, x: f64, y: f64) -> (f64, [f64; OUTPUT_SIZE]) {
        let ceiling = -PDF_EPSILON.ln();
        let nll = self.neg_log_pdf(x, y);
        if nll > ceiling {
            return (ceiling, [0.0; OUTPUT_SIZE]);
        }

        let rho = self.rho;
        let q = 1.0 - rho * rho;
        let a = (x - self.mux) / self.sx;
        let b = (y - self.muy) / self.sy;
        let z = a * a + b * b - 2.0 * rho * a * b;
        let ga = a - rho * b;
        let gb = b - rho * a;

        let grad = [
            -ga / (q * self.sx),
            -gb / (q * self.sy),
            1.0 - a * ga / q,
            1.0 - b * gb / q,
            -rho - a * b + z * rho / q,
        ];
        (nll, grad)
    }

    /// Draw one position: `x = μx + σx·u`,
    /// `y = μy + σy·(ρ·u + sqrt(1 - ρ²)·v)` with `u, v ~ N(0, 1)`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> [f64; 2] {
        let [u, v] = standard_normal_pair(rng);
        [
            self.mux + self.sx * u,
            self.muy + self.sy * (self.rho * u + (1.0 - self.rho * self.rho).sqrt() * v),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn skewed() -> Gaussian2d {
        Gaussian2d::from_raw(&[0.3, -0.2, (0.5f64).ln(), (0.8f64).ln(), 0.6f64.atanh()])
    }

    #[test]
    fn from_raw_bounds_parameters() {
        let g = Gaussian2d::from_raw(&[1.0, 2.0, -50.0, 50.0, 30.0]);
        assert!(g.sx > 0.0);
        assert!(g.sy.is_finite());
        assert!(g.rho <= 1.0);
        assert_eq!(g.mean(), [1.0, 2.0]);
    }

    #[test]
    fn density_integrates_to_one() {
        let g = skewed();
        let (half_w, half_h) = (8.0 * g.sx, 8.0 * g.sy);
        let steps = 800;
        let (dx, dy) = (2.0 * half_w / steps as f64, 2.0 * half_h / steps as f64);
        let mut total = 0.0;
        for i in 0..steps {
            let x = g.mux - half_w + (i as f64 + 0.5) * dx;
            for j in 0..steps {
                let y = g.muy - half_h + (j as f64 + 0.5) * dy;
                total += g.pdf(x, y) * dx * dy;
            }
        }
        assert!((total - 1.0).abs() < 1e-3, "integral = {total}");
    }

    #[test]
    fn standard_density_at_mean() {
        let g = Gaussian2d::from_raw(&[0.0; 5]);
        assert!((g.pdf(0.0, 0.0) - 1.0 / (2.0 * PI)).abs() < 1e-12);
        assert!((g.nll(0.0, 0.0) - (2.0 * PI).ln()).abs() < 1e-12);
    }

    #[test]
    fn far_targets_hit_the_floor() {
        let g = Gaussian2d::from_raw(&[0.0, 0.0, (0.01f64).ln(), (0.01f64).ln(), 0.0]);
        let (nll, grad) = g.nll_with_grad(5.0, 5.0);
        assert_eq!(nll, -PDF_EPSILON.ln());
        assert_eq!(grad, [0.0; 5]);
        assert_eq!(g.nll(5.0, 5.0), nll);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let raw = [0.3, -0.2, -0.4, 0.1, 0.5];
        let (x, y) = (0.9, -0.6);
        let (_, grad) = Gaussian2d::from_raw(&raw).nll_with_grad(x, y);
        let h = 1e-6;
        for k in 0..5 {
            let mut plus = raw;
            let mut minus = raw;
            plus[k] += h;
            minus[k] -= h;
            let numeric = (Gaussian2d::from_raw(&plus).nll(x, y)
                - Gaussian2d::from_raw(&minus).nll(x, y))
                / (2.0 * h);
            assert!(
                (numeric - grad[k]).abs() < 1e-6,
                "component {k}: analytic {} numeric {numeric}",
                grad[k]
            );
        }
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let g = skewed();
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..16 {
            assert_eq!(g.sample(&mut a), g.sample(&mut b));
        }
    }

    #[test]
    fn sample_moments_match_parameters() {
        let g = skewed();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 20_000;
        let draws: Vec<[f64; 2]> = (0..n).map(|_| g.sample(&mut rng)).collect();
        let mean_x = draws.iter().map(|d| d[0]).sum::<f64>() / n as f64;
        let mean_y = draws.iter().map(|d| d[1]).sum::<f64>() / n as f64;
        let cov = draws
            .iter()
            .map(|d| (d[0] - mean_x) * (d[1] - mean_y))
            .sum::<f64>()
            / n as f64;
        assert!((mean_x - g.mux).abs() < 0.02);
        assert!((mean_y - g.muy).abs() < 0.03);
        assert!((cov - g.rho * g.sx * g.sy).abs() < 0.02);
    }

    proptest! {
        #[test]
        fn density_is_symmetric_about_the_mean(
            raw in prop::array::uniform5(-1.0f64..1.0),
            nx in -2.0f64..2.0,
            ny in -2.0f64..2.0,
        ) {
            let g = Gaussian2d::from_raw(&raw);
            let p = g.pdf(g.mux + nx, g.muy + ny);
            let q = g.pdf(g.mux - nx, g.muy - ny);
            prop_assert!((p - q).abs() <= 1e-10 * p.max(1e-300));
        }
    }
}
