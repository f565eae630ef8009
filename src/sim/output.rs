//! Resamples the native solver output onto a uniform grid in years.

use serde::Serialize;

use super::config::SECONDS_PER_YEAR;
use crate::vecutils;

/// Produced temperature on the uniform output grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedSeries {
    /// Sample times in years, `k / steps_per_year`.
    pub times: Vec<f64>,
    pub produced_temperature: Vec<f64>,
}

impl ProjectedSeries {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Uniform grid `k / steps_per_year` (years) for `k = 0..=horizon * steps_per_year`.
pub fn uniform_grid(horizon_years: f64, steps_per_year: usize) -> Vec<f64> {
    let per_year = steps_per_year as f64;
    let count = (horizon_years * per_year + 1e-9).floor() as usize;
    (0..=count).map(|k| k as f64 / per_year).collect()
}

/// Interpolates `values` at native `times` (s) onto the uniform grid.
///
/// Samples within the first year take the largest native value of that year,
/// which hides the start-up transient.
pub fn project(
    times: &[f64],
    values: &[f64],
    horizon_years: f64,
    steps_per_year: usize,
) -> ProjectedSeries {
    let grid = uniform_grid(horizon_years, steps_per_year);
    let first_year: Vec<f64> = times
        .iter()
        .zip(values)
        .filter(|(t, _)| **t <= SECONDS_PER_YEAR)
        .map(|(_, v)| *v)
        .collect();
    let first_year_max = vecutils::max(&first_year);

    let produced_temperature = grid
        .iter()
        .map(|years| {
            if *years <= 1.0 && !first_year.is_empty() {
                first_year_max
            } else {
                vecutils::interp(times, values, years * SECONDS_PER_YEAR)
            }
        })
        .collect();

    ProjectedSeries {
        times: grid,
        produced_temperature,
    }
}

/// Heat carried off by the fluid at start-up, in W.
pub fn initial_heat_content(
    mass_flow: f64,
    specific_heat: f64,
    produced_temperature: f64,
    injection_temperature: f64,
) -> f64 {
    mass_flow * specific_heat * (produced_temperature - injection_temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_grid() {
        let g = uniform_grid(2.0, 4);
        assert_eq!(g.len(), 9);
        assert_eq!(g[0], 0.0);
        assert_eq!(g[8], 2.0);
        assert!((g[1] - 0.25).abs() < 1e-12);
        assert_eq!(uniform_grid(30.0, 1).len(), 31);
        // Partial last year is dropped
        assert_eq!(uniform_grid(2.5, 1), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_projection_interpolates_after_first_year() {
        let y = SECONDS_PER_YEAR;
        let times = [0.0, 0.5 * y, y, 3.0 * y];
        let values = [20.0, 90.0, 80.0, 60.0];
        let p = project(&times, &values, 3.0, 2);
        assert_eq!(p.len(), 7);
        // t <= 1 year: first year's maximum
        for v in &p.produced_temperature[..3] {
            assert_eq!(*v, 90.0);
        }
        assert!((p.produced_temperature[3] - 75.0).abs() < 1e-9);
        assert!((p.produced_temperature[4] - 70.0).abs() < 1e-9);
        assert!((p.produced_temperature[6] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_heat_content() {
        let q = initial_heat_content(20.0, 4180.0, 90.0, 50.0);
        assert!((q - 3.344e6).abs() < 1e-3);
        assert!(initial_heat_content(20.0, 4180.0, 40.0, 50.0) < 0.0);
    }
}
