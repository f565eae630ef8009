//! Tabulated integrals of the cylinder-source and finite-length responses.

use std::f64::consts::PI;

use rayon::prelude::*;

use super::KernelContext;
use crate::sim::special::{bessel_j1, bessel_y1, erfc};
use crate::vecutils;

/// Values of a function on a log-spaced argument grid.
///
/// Lookups interpolate linearly in `ln(x)` and clamp outside the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct LogTable {
    log_x: Vec<f64>,
    values: Vec<f64>,
}

impl LogTable {
    /// Tabulates `f` at `n` log-spaced points of `[lo, hi]`, in parallel.
    pub fn build<F>(lo: f64, hi: f64, n: usize, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Sync,
    {
        let xs = vecutils::logspace(lo, hi, n.max(2));
        let values: Vec<f64> = xs.par_iter().map(|&x| f(x)).collect();
        let log_x = xs.iter().map(|x| x.ln()).collect();
        Self { log_x, values }
    }

    pub fn lookup(&self, x: f64) -> f64 {
        vecutils::interp(&self.log_x, &self.values, x.ln())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First and last argument of the grid.
    pub fn domain(&self) -> (f64, f64) {
        match (self.log_x.first(), self.log_x.last()) {
            (Some(a), Some(b)) => (a.exp(), b.exp()),
            _ => (f64::NAN, f64::NAN),
        }
    }
}

/// Precomputed tables of the adaptive slender-body kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct SbtTables {
    pub context: KernelContext,
    /// Dimensionless cylinder-source response versus Fourier number.
    pub cylinder: LogTable,
    /// Finite-length correction versus `alpha t / L^2`.
    pub finite_correction: LogTable,
    /// Quadrature points used per table value, as `(cylinder, correction)`.
    pub discretization: (usize, usize),
}

impl SbtTables {
    pub fn build(context: &KernelContext) -> Self {
        let s = context.settings();
        let fo_min = context.alpha_min * context.dt_min / context.r_max.powi(2);
        let cyl_lo = 0.5 * fo_min.min(s.cylinder_fourier_limit);
        let cyl_hi = 2.0 * s.cylinder_fourier_limit;
        let cylinder = LogTable::build(cyl_lo, cyl_hi, s.cylinder_args, |fo| {
            cylinder_response(fo, s.cylinder_discretization)
        });

        let fpc_lo = 0.5 * s.infinite_model_time;
        let fpc_hi = 2.0 * s.point_source_time;
        let finite_correction = LogTable::build(fpc_lo, fpc_hi, s.fpc_args, |x| {
            finite_length_correction(x, s.fpc_discretization)
        });

        tracing::info!(
            "built kernel tables (accuracy {}): cylinder {} x {} over Fo [{:.3e}, {:.1}], \
             correction {} x {}",
            s.level,
            cylinder.len(),
            s.cylinder_discretization,
            cyl_lo,
            cyl_hi,
            finite_correction.len(),
            s.fpc_discretization
        );

        Self {
            context: *context,
            cylinder,
            finite_correction,
            discretization: (s.cylinder_discretization, s.fpc_discretization),
        }
    }
}

/// Dimensionless wall temperature of an infinite cylinder source.
///
/// `G(Fo) = 2/pi^3 ∫ (1 - exp(-b^2 Fo)) / (b^3 (J1(b)^2 + Y1(b)^2)) db` so that
/// the wall temperature drop is `q' G / k`. Integrated on `b = e^s` with the
/// trapezoid rule, plus the analytic tail beyond the upper limit.
pub fn cylinder_response(fo: f64, discretization: usize) -> f64 {
    let scale = 1.0 / fo.sqrt();
    let lo = 1e-3 * scale.min(1.0);
    let hi = 1e3 * scale.max(1.0);
    let s = vecutils::linspace(lo.ln(), hi.ln(), discretization.max(2));
    let integrand: Vec<f64> = s
        .iter()
        .map(|&si| {
            let b = si.exp();
            let j = bessel_j1(b);
            let y = bessel_y1(b);
            // Extra factor b from db = b ds
            -(-b * b * fo).exp_m1() / (b * b * (j * j + y * y))
        })
        .collect();
    // Integrand tends to pi / (2 b^2) for large b
    let tail = PI / (2.0 * hi);
    2.0 / PI.powi(3) * (vecutils::trapezoid(&s, &integrand) + tail)
}

/// Finite-length correction `F(x) = ∫_{u0}^∞ erfc(u) / u du`, `u0 = 1 / (4 sqrt(x))`.
///
/// Integrated on `u = e^s` up to `u0 + 6`, beyond which `erfc` vanishes.
pub fn finite_length_correction(x: f64, discretization: usize) -> f64 {
    let u0 = 0.25 / x.sqrt();
    let s = vecutils::linspace(u0.ln(), (u0 + 6.0).ln(), discretization.max(2));
    let integrand: Vec<f64> = s.iter().map(|&si| erfc(si.exp())).collect();
    vecutils::trapezoid(&s, &integrand)
}
