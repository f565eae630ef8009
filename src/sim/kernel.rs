//! Analytical heat-response kernels of the rock around the well elements.
//!
//! A kernel returns the rock-wall temperature drop (K) at a receiving element
//! caused by a unit heat extraction rate (1 W/m) applied at a source element
//! for an elapsed time. Self responses use the element itself as source.

pub mod line_source;
pub mod sbt;
pub mod tables;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub use line_source::LineSourceKernel;
pub use sbt::SbtKernel;
pub use tables::{LogTable, SbtTables};

use super::discretization::{DiscretizedNetwork, Element};

/// Resolution and regime thresholds of one accuracy level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracySettings {
    pub level: u8,
    /// Argument points of the finite-length correction table.
    pub fpc_args: usize,
    /// Quadrature points per finite-length correction value.
    pub fpc_discretization: usize,
    /// Argument points of the cylinder-source table.
    pub cylinder_args: usize,
    /// Quadrature points per cylinder-source value.
    pub cylinder_discretization: usize,
    /// `alpha t / L^2` above which an element acts as a point source on itself.
    pub point_source_time: f64,
    /// Fourier number `alpha t / r^2` below which the cylinder source is used.
    pub cylinder_fourier_limit: f64,
    /// `alpha t / L^2` below which the element is treated as infinitely long.
    pub infinite_model_time: f64,
    /// `alpha t / S^2` below which heat has not reached a neighbour.
    pub arrival_time: f64,
    /// `S / L` above which a neighbour acts as a point source.
    pub point_source_ratio: f64,
    /// Quadrature points along a finite line source.
    pub line_points: usize,
}

impl AccuracySettings {
    /// Settings for `level` (clamped to 1..=5).
    pub fn for_level(level: u8) -> Self {
        let level = level.clamp(1, 5);
        let (fpc_args, fpc_discretization, cylinder_args, cylinder_discretization) = match level {
            1 => (25, 200, 25, 200),
            2 => (50, 250, 50, 500),
            3 => (100, 500, 100, 1000),
            4 => (200, 1000, 200, 1500),
            _ => (400, 2000, 400, 2000),
        };
        let (point_source_time, cylinder_fourier_limit, infinite_model_time) = match level {
            1 => (1.5, 25.0, 0.05),
            2 => (2.5, 50.0, 0.01),
            3 => (5.0, 100.0, 0.004),
            4 => (10.0, 200.0, 0.002),
            _ => (20.0, 400.0, 0.001),
        };
        let (arrival_time, point_source_ratio, line_points) = match level {
            1 => (0.1, 1.5, 3),
            2 => (0.04, 2.0, 4),
            3 => (0.02, 3.0, 5),
            4 => (0.01, 5.0, 10),
            _ => (0.005, 9.0, 20),
        };
        Self {
            level,
            fpc_args,
            fpc_discretization,
            cylinder_args,
            cylinder_discretization,
            point_source_time,
            cylinder_fourier_limit,
            infinite_model_time,
            arrival_time,
            point_source_ratio,
            line_points,
        }
    }
}

/// Inputs that fix the kernel tables of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelContext {
    pub accuracy: u8,
    /// Smallest rock diffusivity (m^2/s).
    pub alpha_min: f64,
    /// Shortest time step (s).
    pub dt_min: f64,
    /// Largest element radius (m).
    pub r_max: f64,
}

impl KernelContext {
    pub fn new(network: &DiscretizedNetwork, accuracy: u8, dt_min: f64) -> Self {
        let alpha_min = network
            .elements
            .iter()
            .map(|e| e.rock.diffusivity())
            .fold(f64::INFINITY, f64::min);
        let r_max = network
            .elements
            .iter()
            .map(|e| e.radius)
            .fold(0.0, f64::max);
        Self {
            accuracy,
            alpha_min,
            dt_min,
            r_max,
        }
    }

    pub fn settings(&self) -> AccuracySettings {
        AccuracySettings::for_level(self.accuracy)
    }

    /// Content hash used to share tables between runs.
    pub fn cache_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.accuracy.hash(&mut hasher);
        for v in [self.alpha_min, self.dt_min, self.r_max] {
            v.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// One kernel query.
#[derive(Debug, Clone, Copy)]
pub enum KernelArgs<'a> {
    SelfResponse {
        element: &'a Element,
        elapsed: f64,
    },
    Neighbor {
        receiver: &'a Element,
        source: &'a Element,
        /// Midpoint distance between the two elements.
        spacing: f64,
        elapsed: f64,
    },
}

/// Response model selected for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Negligible,
    PointSource,
    Cylindrical,
    InfiniteLine,
    FiniteLine,
}

/// Number of kernel evaluations per regime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegimeCounts {
    pub negligible: usize,
    pub point_source: usize,
    pub cylindrical: usize,
    pub infinite_line: usize,
    pub finite_line: usize,
    /// Self responses with the finite-length correction applied.
    pub finite_correction: usize,
}

impl RegimeCounts {
    pub fn record(&mut self, regime: Regime) {
        match regime {
            Regime::Negligible => self.negligible += 1,
            Regime::PointSource => self.point_source += 1,
            Regime::Cylindrical => self.cylindrical += 1,
            Regime::InfiniteLine => self.infinite_line += 1,
            Regime::FiniteLine => self.finite_line += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.negligible
            + self.point_source
            + self.cylindrical
            + self.infinite_line
            + self.finite_line
    }
}

/// Heat-response kernel.
///
/// `precompute` runs once per run (or is shared through the cache), and
/// `evaluate` is called for every interacting pair at every time difference.
pub trait ThermalKernel: Send + Sync {
    type Tables: Send + Sync;

    fn precompute(&self, context: &KernelContext) -> Self::Tables;

    fn evaluate(&self, tables: &Self::Tables, args: &KernelArgs<'_>) -> f64;

    /// Regime used by `evaluate`, and whether a finite-length correction applies.
    fn classify(&self, args: &KernelArgs<'_>) -> (Regime, bool);
}
