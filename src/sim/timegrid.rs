//! Non-uniform simulation time grid.

use super::config::TimeConfig;
use crate::vecutils;

/// Times (s) at which the solver produces a state, starting at 0.
///
/// The grid is uniform up to the transition time and logarithmically spaced
/// from there to the horizon, which is hit exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    pub fn new(config: &TimeConfig) -> Self {
        let horizon = config.horizon_seconds();
        let mut times = vecutils::linspace(
            0.0,
            config.transition_time,
            config.initial_timestep_count + 1,
        );
        let late = vecutils::logspace(
            config.transition_time,
            horizon,
            config.final_timestep_count + 1,
        );
        times.extend(late.into_iter().skip(1));
        debug_assert!(vecutils::is_strictly_increasing(&times));
        Self { times }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of steps (intervals), one less than the number of times.
    pub fn num_steps(&self) -> usize {
        self.times.len() - 1
    }

    /// Length of step `n` (1-based, `t[n] - t[n-1]`).
    pub fn step_length(&self, n: usize) -> f64 {
        self.times[n] - self.times[n - 1]
    }

    /// Shortest step of the grid.
    pub fn min_step(&self) -> f64 {
        self.times
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(f64::INFINITY, f64::min)
    }

    pub fn horizon(&self) -> f64 {
        self.times[self.times.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::config::SECONDS_PER_YEAR;

    #[test]
    fn test_default_grid() {
        let config = TimeConfig::default();
        let grid = TimeGrid::new(&config);
        let t = grid.times();
        assert_eq!(t[0], 0.0);
        assert_eq!(grid.num_steps(), 5 + 70);
        assert!(vecutils::is_strictly_increasing(t));
        assert_eq!(grid.horizon(), 30.0 * SECONDS_PER_YEAR);
        assert!((t[5] - 9900.0).abs() < 1e-9);
        assert!((grid.step_length(1) - 1980.0).abs() < 1e-9);
        assert!(grid.min_step() > 0.0 && grid.min_step() <= grid.step_length(1));
    }

    #[test]
    fn test_log_period_grows() {
        let grid = TimeGrid::new(&TimeConfig::default());
        let n = grid.num_steps();
        assert!(grid.step_length(n) > grid.step_length(7));
    }
}
