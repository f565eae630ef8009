//! Adaptive slender-body kernel.
//!
//! The response model is picked per query from the elapsed time and the
//! pair geometry. Self responses switch between the cylinder source (short
//! times), the infinite line source and the point-source limit, with the
//! finite-length correction once heat has spread along the element.
//! Neighbour responses use point sources for distant pairs, infinite lines
//! for parallel overlapping pairs at short times and a finite line
//! quadrature otherwise.

use std::f64::consts::PI;

use super::tables::SbtTables;
use super::{AccuracySettings, KernelArgs, KernelContext, Regime, ThermalKernel};
use crate::sim::discretization::Element;
use crate::sim::special::{erfc, exp1};

/// `|u_i . u_j|` above which two elements count as parallel.
const PARALLEL_COS: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SbtKernel {
    settings: AccuracySettings,
}

impl SbtKernel {
    pub fn new(accuracy: u8) -> Self {
        Self {
            settings: AccuracySettings::for_level(accuracy),
        }
    }

    pub fn settings(&self) -> &AccuracySettings {
        &self.settings
    }

    fn self_regime(&self, element: &Element, elapsed: f64) -> (Regime, bool) {
        let s = &self.settings;
        let alpha_t = element.rock.diffusivity() * elapsed;
        let x = alpha_t / element.length.powi(2);
        if x >= s.point_source_time {
            return (Regime::PointSource, false);
        }
        let fo = alpha_t / element.radius.powi(2);
        let base = if fo < s.cylinder_fourier_limit {
            Regime::Cylindrical
        } else {
            Regime::InfiniteLine
        };
        (base, x > s.infinite_model_time)
    }

    fn neighbor_regime(
        &self,
        receiver: &Element,
        source: &Element,
        spacing: f64,
        elapsed: f64,
    ) -> Regime {
        let s = &self.settings;
        let alpha_t = source.rock.diffusivity() * elapsed;
        if alpha_t / spacing.powi(2) < s.arrival_time {
            return Regime::Negligible;
        }
        if spacing / source.length >= s.point_source_ratio {
            return Regime::PointSource;
        }
        if alpha_t / source.length.powi(2) < s.infinite_model_time
            && axial_overlap(receiver, source).is_some()
        {
            return Regime::InfiniteLine;
        }
        Regime::FiniteLine
    }
}

impl ThermalKernel for SbtKernel {
    type Tables = SbtTables;

    fn precompute(&self, context: &KernelContext) -> SbtTables {
        SbtTables::build(context)
    }

    fn evaluate(&self, tables: &SbtTables, args: &KernelArgs<'_>) -> f64 {
        match *args {
            KernelArgs::SelfResponse { element, elapsed } => {
                if elapsed <= 0.0 {
                    return 0.0;
                }
                let k = element.rock.conductivity;
                let alpha_t = element.rock.diffusivity() * elapsed;
                let (regime, corrected) = self.self_regime(element, elapsed);
                let base = match regime {
                    Regime::PointSource => {
                        return point_source_self(element.length, element.radius, k, alpha_t);
                    }
                    Regime::Cylindrical => {
                        tables.cylinder.lookup(alpha_t / element.radius.powi(2)) / k
                    }
                    _ => infinite_line(element.radius, k, alpha_t),
                };
                if corrected {
                    let x = alpha_t / element.length.powi(2);
                    base - tables.finite_correction.lookup(x) / (2.0 * PI * k)
                } else {
                    base
                }
            }
            KernelArgs::Neighbor {
                receiver,
                source,
                spacing,
                elapsed,
            } => {
                if elapsed <= 0.0 {
                    return 0.0;
                }
                let k = source.rock.conductivity;
                let alpha_t = source.rock.diffusivity() * elapsed;
                match self.neighbor_regime(receiver, source, spacing, elapsed) {
                    Regime::Negligible => 0.0,
                    Regime::PointSource => point_source(source.length, spacing, k, alpha_t),
                    Regime::InfiniteLine => {
                        let d = axial_overlap(receiver, source)
                            .unwrap_or(spacing)
                            .max(source.radius);
                        infinite_line(d, k, alpha_t)
                    }
                    _ => finite_line(receiver, source, k, alpha_t, self.settings.line_points),
                }
            }
        }
    }

    fn classify(&self, args: &KernelArgs<'_>) -> (Regime, bool) {
        match *args {
            KernelArgs::SelfResponse { element, elapsed } => self.self_regime(element, elapsed),
            KernelArgs::Neighbor {
                receiver,
                source,
                spacing,
                elapsed,
            } => (self.neighbor_regime(receiver, source, spacing, elapsed), false),
        }
    }
}

/// Infinite line source at distance `r`.
pub fn infinite_line(r: f64, k: f64, alpha_t: f64) -> f64 {
    exp1(r * r / (4.0 * alpha_t)) / (4.0 * PI * k)
}

/// Point source of strength `length` (W per W/m) seen at distance `r`.
pub fn point_source(length: f64, r: f64, k: f64, alpha_t: f64) -> f64 {
    length * erfc(r / (2.0 * alpha_t.sqrt())) / (4.0 * PI * k * r)
}

/// Late-time self response of a finite element of length `l` and radius `r`.
fn point_source_self(l: f64, r: f64, k: f64, alpha_t: f64) -> f64 {
    (l / (2.0 * r)).asinh() / (2.0 * PI * k) - l / (4.0 * PI * k * (PI * alpha_t).sqrt())
}

/// Perpendicular distance from the receiver midpoint to the source axis, if
/// the elements are parallel and the midpoint projects onto the source.
fn axial_overlap(receiver: &Element, source: &Element) -> Option<f64> {
    if receiver.direction.dot(source.direction).abs() <= PARALLEL_COS {
        return None;
    }
    let rel = receiver.midpoint - source.start;
    let along = rel.dot(source.direction);
    if !(0.0..=source.length).contains(&along) {
        return None;
    }
    Some((rel - source.direction * along).length())
}

/// Midpoint quadrature of a finite line source over `points` sub-segments.
fn finite_line(receiver: &Element, source: &Element, k: f64, alpha_t: f64, points: usize) -> f64 {
    let points = points.max(1);
    let dl = source.length / points as f64;
    let two_sqrt_at = 2.0 * alpha_t.sqrt();
    let sum: f64 = (0..points)
        .map(|m| {
            let p = source.start + source.direction * (dl * (m as f64 + 0.5));
            let d = receiver.midpoint.distance(&p).max(source.radius);
            erfc(d / two_sqrt_at) / d
        })
        .sum();
    sum * dl / (4.0 * PI * k)
}
