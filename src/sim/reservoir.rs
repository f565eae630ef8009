//! Entry point of a run: wires geometry, kernel, solver and output together
//! and memoizes results by configuration content.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;

use super::config::{KernelKind, SbtConfig};
use super::discretization::{DiscretizedNetwork, discretize};
use super::error::{SbtError, SimWarning};
use super::kernel::{
    KernelContext, LineSourceKernel, RegimeCounts, SbtKernel, SbtTables, ThermalKernel,
};
use super::output::{self, ProjectedSeries};
use super::solver::{SolverRun, TimeMarchingSolver};
use super::timegrid::TimeGrid;
use crate::geom::wireframe::Wireframe;

/// Well path and its discretization.
#[derive(Debug, Clone)]
pub struct ReservoirGeometry {
    pub wireframe: Wireframe,
    pub network: DiscretizedNetwork,
}

impl ReservoirGeometry {
    /// Builds the wireframe from the configuration and discretizes it.
    pub fn build(config: &SbtConfig, horizon: f64) -> Result<Self, SbtError> {
        let wireframe = Wireframe::build(&config.geometry)?;
        Self::from_wireframe(wireframe, config, horizon)
    }

    /// Discretizes a given wireframe, e.g. one edited after building.
    pub fn from_wireframe(
        wireframe: Wireframe,
        config: &SbtConfig,
        horizon: f64,
    ) -> Result<Self, SbtError> {
        let network = discretize(&wireframe, config, horizon)?;
        Ok(Self { wireframe, network })
    }
}

/// Solver output on its own non-uniform time grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NativeSeries {
    /// Times in s.
    pub times: Vec<f64>,
    pub produced_temperature: Vec<f64>,
    pub injection_temperature: Vec<f64>,
    /// Mass flow in kg/s.
    pub flow_rate: Vec<f64>,
    /// Heat extraction rate in W.
    pub heat_extraction: Vec<f64>,
    /// Frictional pressure drop in Pa.
    pub friction_pressure_drop: Vec<f64>,
    /// Hydrostatic pressure difference in Pa (negative: thermosiphon).
    pub hydrostatic_pressure_drop: Vec<f64>,
}

impl NativeSeries {
    fn from_run(run: &SolverRun) -> Self {
        let mut s = Self::default();
        for r in &run.records {
            s.times.push(r.time);
            s.produced_temperature.push(r.produced_temperature);
            s.injection_temperature.push(r.injection_temperature);
            s.flow_rate.push(r.mass_flow);
            s.heat_extraction.push(r.heat_extraction);
            s.friction_pressure_drop.push(r.pressure_drop.friction);
            s.hydrostatic_pressure_drop.push(r.pressure_drop.hydrostatic);
        }
        s
    }
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub native: NativeSeries,
    pub projected: ProjectedSeries,
    /// Heat carried off at start-up, in W.
    pub initial_heat_content: f64,
    /// Geometry warnings followed by the warnings raised while stepping.
    pub warnings: Vec<SimWarning>,
    pub element_count: usize,
    pub regime_counts: RegimeCounts,
}

/// Runs simulations and caches results and kernel tables.
///
/// Results are keyed on the content of the resolved configuration (profile
/// files inlined), kernel tables on the [`KernelContext`] they were built for.
#[derive(Debug, Default)]
pub struct SbtReservoir {
    results: HashMap<u64, Arc<SimulationResult>>,
    tables: HashMap<u64, Arc<SbtTables>>,
}

impl SbtReservoir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_results(&self) -> usize {
        self.results.len()
    }

    pub fn cached_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn clear(&mut self) {
        self.results.clear();
        self.tables.clear();
    }

    /// Runs the configuration, or returns the cached result of an equal one.
    pub fn simulate(&mut self, config: &SbtConfig) -> Result<Arc<SimulationResult>, SbtError> {
        config.validate()?;
        let resolved = resolve_profiles(config)?;
        let key = content_hash(&resolved)?;
        if let Some(result) = self.results.get(&key) {
            tracing::info!("reusing cached result {key:016x}");
            return Ok(Arc::clone(result));
        }

        let geometry = ReservoirGeometry::build(&resolved, resolved.time.horizon_seconds())?;
        let result = Arc::new(self.simulate_geometry(&resolved, &geometry)?);
        self.results.insert(key, Arc::clone(&result));
        Ok(result)
    }

    /// Runs the configuration on a prepared geometry. Results are not cached.
    pub fn simulate_geometry(
        &mut self,
        config: &SbtConfig,
        geometry: &ReservoirGeometry,
    ) -> Result<SimulationResult, SbtError> {
        config.validate()?;
        let grid = TimeGrid::new(&config.time);
        let network = &geometry.network;
        tracing::info!(
            "simulating {} elements over {} steps ({:?} kernel, accuracy {})",
            network.len(),
            grid.num_steps(),
            config.numerics.kernel,
            config.numerics.accuracy
        );

        let run = match config.numerics.kernel {
            KernelKind::Sbt => {
                let kernel = SbtKernel::new(config.numerics.accuracy);
                let context =
                    KernelContext::new(network, config.numerics.accuracy, grid.min_step());
                let tables = self.tables_for(&kernel, &context);
                TimeMarchingSolver::new(config, network, &grid, kernel, tables)?.run()?
            }
            KernelKind::LineSource => {
                TimeMarchingSolver::new(config, network, &grid, LineSourceKernel, Arc::new(()))?
                    .run()?
            }
        };

        let native = NativeSeries::from_run(&run);
        let projected = output::project(
            &native.times,
            &native.produced_temperature,
            config.time.horizon_years,
            config.output.time_steps_per_year,
        );
        let t_inj = native.injection_temperature.first().copied().unwrap_or(f64::NAN);
        let cp = config.fluid.model().properties(t_inj).specific_heat;
        let initial_heat_content = output::initial_heat_content(
            native.flow_rate.first().copied().unwrap_or(0.0),
            cp,
            projected.produced_temperature.first().copied().unwrap_or(t_inj),
            t_inj,
        );

        let mut warnings = network.warnings.clone();
        warnings.extend(run.warnings.iter().cloned());

        Ok(SimulationResult {
            native,
            projected,
            initial_heat_content,
            warnings,
            element_count: network.len(),
            regime_counts: run.regime_counts,
        })
    }

    fn tables_for(&mut self, kernel: &SbtKernel, context: &KernelContext) -> Arc<SbtTables> {
        let key = context.cache_key();
        let tables = self
            .tables
            .entry(key)
            .or_insert_with(|| Arc::new(kernel.precompute(context)));
        Arc::clone(tables)
    }
}

/// Copy of the configuration with file profiles loaded and validated.
fn resolve_profiles(config: &SbtConfig) -> Result<SbtConfig, SbtError> {
    let horizon = config.time.horizon_seconds();
    let mut resolved = config.clone();
    resolved.operation.flow_rate = config
        .operation
        .flow_rate
        .resolve("flow rate", horizon)?
        .to_source();
    resolved.operation.injection_temperature = config
        .operation
        .injection_temperature
        .resolve("injection temperature", horizon)?
        .to_source();
    Ok(resolved)
}

/// Hash of a configuration's serialized content.
pub fn content_hash(config: &SbtConfig) -> Result<u64, SbtError> {
    let bytes = serde_json::to_vec(config)
        .map_err(|e| SbtError::config("config", format!("cannot serialize: {e}")))?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::profile::ProfileSource;
    use std::io::Write;

    fn small_config() -> SbtConfig {
        let mut config = SbtConfig::default();
        config.geometry.element_length = 200.0;
        config.time.horizon_years = 2.0;
        config.time.initial_timestep_count = 5;
        config.time.final_timestep_count = 12;
        config.output.time_steps_per_year = 4;
        config
    }

    #[test]
    fn test_content_hash() {
        let a = small_config();
        let mut b = small_config();
        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
        b.rock.geothermal_gradient = 0.04;
        assert_ne!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }

    #[test]
    fn test_file_profile_hashes_like_series() {
        let horizon = small_config().time.horizon_seconds();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "time,flow").unwrap();
        writeln!(file, "0,20").unwrap();
        writeln!(file, "{horizon},15").unwrap();

        let mut from_file = small_config();
        from_file.operation.flow_rate = ProfileSource::File(file.path().to_path_buf());
        let mut from_series = small_config();
        from_series.operation.flow_rate = ProfileSource::Series(vec![[0.0, 20.0], [horizon, 15.0]]);

        let a = content_hash(&resolve_profiles(&from_file).unwrap()).unwrap();
        let b = content_hash(&resolve_profiles(&from_series).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_simulate_and_cache() {
        let mut reservoir = SbtReservoir::new();
        let config = small_config();
        let first = reservoir.simulate(&config).unwrap();
        let again = reservoir.simulate(&config).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(reservoir.cached_results(), 1);
        assert_eq!(reservoir.cached_tables(), 1);

        // A different flow rate reuses the kernel tables
        let mut other = config.clone();
        other.operation.flow_rate = ProfileSource::Constant(25.0);
        let third = reservoir.simulate(&other).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(reservoir.cached_results(), 2);
        assert_eq!(reservoir.cached_tables(), 1);

        reservoir.clear();
        assert_eq!(reservoir.cached_results(), 0);
    }

    #[test]
    fn test_result_shape() {
        let config = small_config();
        let result = SbtReservoir::new().simulate(&config).unwrap();
        let steps = config.time.initial_timestep_count + config.time.final_timestep_count;
        assert_eq!(result.native.times.len(), steps + 1);
        assert_eq!(result.native.heat_extraction.len(), steps + 1);
        assert_eq!(result.projected.len(), 9);
        assert_eq!(result.projected.times[8], 2.0);
        assert!(result.element_count > 0);
        assert!(result.regime_counts.total() > 0);

        let t0 = result.projected.produced_temperature[0];
        assert!(t0 > 50.0);
        let expected = 20.0 * 4180.0 * (t0 - 50.0);
        assert!(
            (result.initial_heat_content - expected).abs() / expected < 0.01,
            "{} vs {expected}",
            result.initial_heat_content
        );
    }

    #[test]
    fn test_line_source_builds_no_tables() {
        let mut config = small_config();
        config.numerics.kernel = KernelKind::LineSource;
        let mut reservoir = SbtReservoir::new();
        let result = reservoir.simulate(&config).unwrap();
        assert_eq!(reservoir.cached_tables(), 0);
        assert_eq!(result.regime_counts.cylindrical, 0);
    }

    #[test]
    fn test_invalid_config_is_rejected_first() {
        let mut config = small_config();
        config.numerics.accuracy = 7;
        let err = SbtReservoir::new().simulate(&config).unwrap_err();
        assert!(matches!(
            err,
            SbtError::InvalidConfig {
                field: "numerics.accuracy",
                ..
            }
        ));
    }
}
