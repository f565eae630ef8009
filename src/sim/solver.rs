//! Time-marching solver of the coupled fluid / rock-interface system.
//!
//! Each step assembles a sparse system with three unknowns per element
//! (outlet fluid temperature, wall temperature, heat rate per unit length)
//! and solves it. The rock response superposes every past heat pulse through
//! the thermal kernel, so the cost of a step grows with the step index.

use std::f64::consts::PI;
use std::sync::Arc;

use rayon::prelude::*;

use super::config::{LinearSolverConfig, LinearSolverKind, SbtConfig};
use super::discretization::{DiscretizedNetwork, Inlet};
use super::error::{SbtError, SimWarning};
use super::fluid::{FluidModel, FluidProperties};
use super::hydraulics::{self, PressureDrop};
use super::kernel::{KernelArgs, RegimeCounts, ThermalKernel};
use super::linalg::{
    BlockPreconditioner, GmresSettings, SolveError, SparseMatrix, gmres, solve_dense,
};
use super::profile::Profile;
use super::timegrid::TimeGrid;

/// Fluid temperature above which water would boil at atmospheric pressure.
const BOILING_PROXY: f64 = 100.0;

/// Unknowns per element: `[T_out, T_wall, Q]`.
const UNKNOWNS: usize = 3;

/// Native output of one time level.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Time in s.
    pub time: f64,
    /// Fluid temperature at the production wellhead, in deg C.
    pub produced_temperature: f64,
    pub injection_temperature: f64,
    /// Total mass flow in kg/s.
    pub mass_flow: f64,
    /// Heat extracted from the rock over the whole network, in W.
    pub heat_extraction: f64,
    pub pressure_drop: PressureDrop,
    /// Linear solver iterations (0 for the direct solver).
    pub iterations: usize,
}

/// Everything a finished solver hands back.
#[derive(Debug, Clone)]
pub struct SolverRun {
    pub records: Vec<StepRecord>,
    pub warnings: Vec<SimWarning>,
    pub regime_counts: RegimeCounts,
}

/// Marches the network state over the time grid.
///
/// The solver owns the heat pulse history and the fluid state. Call
/// [`step`](Self::step) to advance one step at a time or [`run`](Self::run)
/// to go to the horizon.
pub struct TimeMarchingSolver<'a, K: ThermalKernel> {
    network: &'a DiscretizedNetwork,
    grid: &'a TimeGrid,
    kernel: K,
    tables: Arc<K::Tables>,
    fluid: Box<dyn FluidModel + Send + Sync>,
    flow_rate: Profile,
    injection_temperature: Profile,
    implicitness: f64,
    roughness: f64,
    linear_solver: LinearSolverConfig,
    /// Per element: itself first, then its near neighbours.
    interactions: Vec<Vec<usize>>,
    /// Completed steps.
    step: usize,
    /// `history[k][e]`: heat rate of element `e` during step `k`, `history[0]` is zero.
    history: Vec<Vec<f64>>,
    outlet: Vec<f64>,
    midpoint: Vec<f64>,
    wall: Vec<f64>,
    /// Last solution vector, used as the initial guess of the next solve.
    solution: Vec<f64>,
    records: Vec<StepRecord>,
    warnings: Vec<SimWarning>,
    regime_counts: RegimeCounts,
}

impl<'a, K: ThermalKernel> TimeMarchingSolver<'a, K> {
    pub fn new(
        config: &SbtConfig,
        network: &'a DiscretizedNetwork,
        grid: &'a TimeGrid,
        kernel: K,
        tables: Arc<K::Tables>,
    ) -> Result<Self, SbtError> {
        let horizon = grid.horizon();
        let flow_rate = config.operation.flow_rate.resolve("flow rate", horizon)?;
        check_flow_rate(&flow_rate)?;
        let injection_temperature = config
            .operation
            .injection_temperature
            .resolve("injection temperature", horizon)?;

        let interactions = network
            .neighbors
            .iter()
            .enumerate()
            .map(|(i, n)| std::iter::once(i).chain(n.near().iter().copied()).collect())
            .collect();

        let n = network.len();
        let outlet: Vec<f64> = network
            .elements
            .iter()
            .map(|e| e.outlet_rock_temperature)
            .collect();
        let midpoint: Vec<f64> = network.elements.iter().map(|e| e.rock_temperature).collect();
        let wall = midpoint.clone();
        let mut solution = vec![0.0; UNKNOWNS * n];
        for i in 0..n {
            solution[UNKNOWNS * i] = outlet[i];
            solution[UNKNOWNS * i + 1] = wall[i];
        }

        let mut solver = Self {
            network,
            grid,
            kernel,
            tables,
            fluid: config.fluid.model(),
            flow_rate,
            injection_temperature,
            implicitness: config.numerics.implicitness,
            roughness: config.wellbore.roughness,
            linear_solver: config.numerics.linear_solver.clone(),
            interactions,
            step: 0,
            history: vec![vec![0.0; n]],
            outlet,
            midpoint,
            wall,
            solution,
            records: Vec::with_capacity(grid.times().len()),
            warnings: Vec::new(),
            regime_counts: RegimeCounts::default(),
        };
        let initial = solver.initial_record();
        solver.records.push(initial);
        tracing::info!(
            "loop volume {:.1} m3, first fluid transit after {:.0} s",
            network.fluid_volume(),
            solver.transit_time()
        );
        Ok(solver)
    }

    /// Number of completed steps.
    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn is_finished(&self) -> bool {
        self.step >= self.grid.num_steps()
    }

    /// Native records so far, starting with the initial state at t = 0.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Heat pulses per step, `history()[k][e]` in W/m.
    pub fn history(&self) -> &[Vec<f64>] {
        &self.history
    }

    pub fn outlet_temperatures(&self) -> &[f64] {
        &self.outlet
    }

    pub fn midpoint_temperatures(&self) -> &[f64] {
        &self.midpoint
    }

    pub fn wall_temperatures(&self) -> &[f64] {
        &self.wall
    }

    pub fn warnings(&self) -> &[SimWarning] {
        &self.warnings
    }

    /// Time in s for the injected fluid to reach the wellhead at the initial
    /// flow rate. Before it the producer still holds the initial fluid.
    pub fn transit_time(&self) -> f64 {
        let t_inj = self.injection_temperature.value_at(0.0);
        let density = self.fluid.properties(t_inj).density;
        self.network.fluid_volume() * density / self.flow_rate.value_at(0.0)
    }

    /// Advances one step. Returns `None` once the horizon is reached.
    pub fn step(&mut self) -> Result<Option<&StepRecord>, SbtError> {
        if self.is_finished() {
            return Ok(None);
        }
        let n = self.step + 1;
        let t = self.grid.times()[n];
        let dt = self.grid.step_length(n);
        let mass_flow = self.flow_rate.value_at(t);
        let t_inj = self.injection_temperature.value_at(t);

        let props: Vec<FluidProperties> = self
            .midpoint
            .iter()
            .map(|&temp| self.fluid.properties(temp))
            .collect();

        // Responses to this step's pulse and the history of earlier pulses
        let this: &Self = self;
        let responses: Vec<(Vec<f64>, f64)> = (0..this.network.len())
            .into_par_iter()
            .map(|i| this.responses(i, n))
            .collect();

        for (i, others) in self.interactions.iter().enumerate() {
            for &j in others {
                let (regime, corrected) = self.kernel.classify(&self.kernel_args(i, j, dt));
                self.regime_counts.record(regime);
                if corrected {
                    self.regime_counts.finite_correction += 1;
                }
            }
        }

        let (a, b) = self.assemble(mass_flow, t_inj, dt, &props, &responses);
        let (x, iterations, residual) = self.solve(&a, &b, n)?;

        let num = self.network.len();
        let mut pulses = vec![0.0; num];
        for i in 0..num {
            self.outlet[i] = x[UNKNOWNS * i];
            self.wall[i] = x[UNKNOWNS * i + 1];
            pulses[i] = x[UNKNOWNS * i + 2];
        }
        for i in 0..num {
            let t_in = self.inlet_temperature(i, t_inj);
            self.midpoint[i] = 0.5 * (t_in + self.outlet[i]);
        }
        self.check_physical_limit(n);

        let heat_extraction: f64 = self
            .network
            .elements
            .iter()
            .zip(&pulses)
            .map(|(e, q)| e.length * q)
            .sum();
        let produced_temperature = self.wellhead_temperature();
        let pressure_drop =
            hydraulics::network_pressure_drop(self.network, mass_flow, &props, self.roughness);

        tracing::debug!(
            "step {n}/{}: t = {t:.4e} s, produced {produced_temperature:.3} C, \
             {iterations} iterations, residual {residual:.2e}",
            self.grid.num_steps()
        );

        self.history.push(pulses);
        self.solution = x;
        self.step = n;
        self.records.push(StepRecord {
            time: t,
            produced_temperature,
            injection_temperature: t_inj,
            mass_flow,
            heat_extraction,
            pressure_drop,
            iterations,
        });
        Ok(self.records.last())
    }

    /// Steps to the horizon.
    pub fn run(mut self) -> Result<SolverRun, SbtError> {
        while self.step()?.is_some() {}
        let last = self.records.last().map_or(f64::NAN, |r| r.produced_temperature);
        tracing::info!(
            "finished {} steps, final produced temperature {last:.3} C, {} warnings",
            self.step,
            self.warnings.len()
        );
        Ok(self.finish())
    }

    /// Hands back the records, warnings and regime statistics gathered so far.
    pub fn finish(self) -> SolverRun {
        SolverRun {
            records: self.records,
            warnings: self.warnings,
            regime_counts: self.regime_counts,
        }
    }

    fn initial_record(&self) -> StepRecord {
        let props: Vec<FluidProperties> = self
            .midpoint
            .iter()
            .map(|&temp| self.fluid.properties(temp))
            .collect();
        let mass_flow = self.flow_rate.value_at(0.0);
        StepRecord {
            time: 0.0,
            produced_temperature: self.wellhead_temperature(),
            injection_temperature: self.injection_temperature.value_at(0.0),
            mass_flow,
            heat_extraction: 0.0,
            pressure_drop: hydraulics::network_pressure_drop(
                self.network,
                mass_flow,
                &props,
                self.roughness,
            ),
            iterations: 0,
        }
    }

    fn kernel_args(&self, i: usize, j: usize, elapsed: f64) -> KernelArgs<'a> {
        let network: &'a DiscretizedNetwork = self.network;
        let elements = &network.elements;
        if i == j {
            KernelArgs::SelfResponse {
                element: &elements[i],
                elapsed,
            }
        } else {
            KernelArgs::Neighbor {
                receiver: &elements[i],
                source: &elements[j],
                spacing: network.spacing.get(i, j),
                elapsed,
            }
        }
    }

    /// Kernel values at `dt_n` for every interaction of element `i`, and the
    /// history term `H_i` of step `n`.
    fn responses(&self, i: usize, n: usize) -> (Vec<f64>, f64) {
        let times = self.grid.times();
        let t_n = times[n];
        let dt = t_n - times[n - 1];
        let tables = self.tables.as_ref();

        let mut now = Vec::with_capacity(self.interactions[i].len());
        let mut history = 0.0;
        for &j in &self.interactions[i] {
            let g_now = self.kernel.evaluate(tables, &self.kernel_args(i, j, dt));
            now.push(g_now);
            for k in 1..n {
                let dq = self.history[k][j] - self.history[k - 1][j];
                if dq != 0.0 {
                    let g = self
                        .kernel
                        .evaluate(tables, &self.kernel_args(i, j, t_n - times[k - 1]));
                    history += dq * g;
                }
            }
            history -= self.history[n - 1][j] * g_now;
        }
        (now, history)
    }

    fn assemble(
        &self,
        mass_flow: f64,
        t_inj: f64,
        dt: f64,
        props: &[FluidProperties],
        responses: &[(Vec<f64>, f64)],
    ) -> (SparseMatrix, Vec<f64>) {
        let num = self.network.len();
        let theta = self.implicitness;
        let q_old = &self.history[self.history.len() - 1];
        let mut a = SparseMatrix::new(UNKNOWNS * num);
        let mut b = vec![0.0; UNKNOWNS * num];

        for (i, e) in self.network.elements.iter().enumerate() {
            // Row and unknown of each equation share the index
            let (out, wall, q) = (UNKNOWNS * i, UNKNOWNS * i + 1, UNKNOWNS * i + 2);
            let p = &props[i];
            let advection = mass_flow * e.flow_share * p.specific_heat;
            let storage = p.density * p.specific_heat * PI * e.radius * e.radius * e.length / dt;
            // Fluid rows are scaled to unit diagonal
            let scale = 1.0 / (advection + 0.5 * storage);
            let film = hydraulics::film_resistance(mass_flow * e.flow_share, e.diameter(), p);

            // Fluid energy balance
            a.add(out, out, 1.0);
            a.add(out, q, -scale * e.length * theta);
            b[out] = scale
                * (e.length * (1.0 - theta) * q_old[i] + storage * self.midpoint[i]);

            // Fluid to wall
            a.add(wall, wall, 1.0);
            a.add(wall, out, -0.5);
            a.add(wall, q, -film);

            match &self.network.inlets[i] {
                Inlet::Injection => {
                    b[out] += scale * (advection - 0.5 * storage) * t_inj;
                    b[wall] += 0.5 * t_inj;
                }
                inlet => {
                    for (j, w) in inlet.upstream() {
                        a.add(out, UNKNOWNS * j, scale * w * (0.5 * storage - advection));
                        a.add(wall, UNKNOWNS * j, -0.5 * w);
                    }
                }
            }

            // Rock response
            let (now, history) = &responses[i];
            a.add(q, wall, 1.0);
            for (&j, g) in self.interactions[i].iter().zip(now) {
                a.add(q, UNKNOWNS * j + 2, *g);
            }
            b[q] = e.rock_temperature - history;
        }
        (a, b)
    }

    fn solve(
        &self,
        a: &SparseMatrix,
        b: &[f64],
        step: usize,
    ) -> Result<(Vec<f64>, usize, f64), SbtError> {
        let failed = |err: SolveError| SbtError::LinearAlgebra {
            step,
            element: err.index().map(|i| i / UNKNOWNS),
            reason: err.to_string(),
        };
        match self.linear_solver.kind {
            LinearSolverKind::Gmres => {
                let precond = BlockPreconditioner::new(a).map_err(failed)?;
                let settings = GmresSettings {
                    max_iterations: self.linear_solver.max_iterations,
                    restart: self.linear_solver.restart,
                    rel_tolerance: self.linear_solver.rel_tolerance,
                    abs_tolerance: self.linear_solver.abs_tolerance,
                };
                let mut x = self.solution.clone();
                let stats = gmres(a, b, &mut x, &precond, &settings).map_err(failed)?;
                Ok((x, stats.iterations, stats.residual))
            }
            LinearSolverKind::Dense => {
                let x = solve_dense(a.to_dense(), b.to_vec()).map_err(failed)?;
                Ok((x, 0, 0.0))
            }
        }
    }

    fn inlet_temperature(&self, i: usize, t_inj: f64) -> f64 {
        match &self.network.inlets[i] {
            Inlet::Injection => t_inj,
            Inlet::Single(j) => self.outlet[*j],
            Inlet::Merge(sources) => sources.iter().map(|(j, w)| w * self.outlet[*j]).sum(),
        }
    }

    /// Linear extrapolation of the last two producer midpoints to the wellhead.
    fn wellhead_temperature(&self) -> f64 {
        let range = &self.network.producer_range;
        let last = range.end - 1;
        if range.len() < 2 {
            return self.outlet[last];
        }
        let prev = last - 1;
        let elements = &self.network.elements;
        let (l_prev, l_last) = (elements[prev].length, elements[last].length);
        let slope = (self.midpoint[last] - self.midpoint[prev]) / (0.5 * (l_prev + l_last));
        self.midpoint[last] + slope * 0.5 * l_last
    }

    fn check_physical_limit(&mut self, step: usize) {
        let hottest = self
            .outlet
            .iter()
            .zip(&self.midpoint)
            .map(|(o, m)| o.max(*m))
            .enumerate()
            .fold(None, |acc: Option<(usize, f64)>, (i, temp)| match acc {
                Some((_, best)) if best >= temp => acc,
                _ => Some((i, temp)),
            });
        if let Some((element, temperature)) = hottest {
            if temperature >= BOILING_PROXY {
                let warning = SimWarning::PhysicalLimit {
                    step,
                    element,
                    temperature,
                };
                warning.log();
                self.warnings.push(warning);
            }
        }
    }
}

fn check_flow_rate(profile: &Profile) -> Result<(), SbtError> {
    let positive = match profile {
        Profile::Constant(value) => *value > 0.0,
        Profile::Table { values, .. } => values.iter().all(|v| *v > 0.0),
    };
    if positive {
        Ok(())
    } else {
        Err(SbtError::config("operation.flow_rate", "must be > 0 at all times"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::wireframe::Wireframe;
    use crate::sim::config::SbtConfig;
    use crate::sim::discretization::discretize;
    use crate::sim::fluid::FluidConfig;
    use crate::sim::kernel::{KernelContext, LineSourceKernel, SbtKernel};
    use crate::sim::profile::ProfileSource;

    fn small_config() -> SbtConfig {
        let mut config = SbtConfig::default();
        config.geometry.element_length = 200.0;
        config.time.horizon_years = 1.0;
        config.time.initial_timestep_count = 5;
        config.time.final_timestep_count = 10;
        config
    }

    fn setup(config: &SbtConfig) -> (DiscretizedNetwork, TimeGrid) {
        let grid = TimeGrid::new(&config.time);
        let wf = Wireframe::build(&config.geometry).unwrap();
        let net = discretize(&wf, config, grid.horizon()).unwrap();
        (net, grid)
    }

    fn run_sbt(config: &SbtConfig) -> SolverRun {
        let (net, grid) = setup(config);
        let kernel = SbtKernel::new(config.numerics.accuracy);
        let ctx = KernelContext::new(&net, config.numerics.accuracy, grid.min_step());
        let tables = Arc::new(kernel.precompute(&ctx));
        TimeMarchingSolver::new(config, &net, &grid, kernel, tables)
            .unwrap()
            .run()
            .unwrap()
    }

    #[test]
    fn test_transit_time() {
        let config = small_config();
        let (net, grid) = setup(&config);
        let solver =
            TimeMarchingSolver::new(&config, &net, &grid, LineSourceKernel, Arc::new(())).unwrap();
        // 2 x 2070.7 m of 0.3 m pipe and 900 m of 0.25 m pipe
        let volume = PI * (0.15f64.powi(2) * 2.0 * 2070.71 + 0.125f64.powi(2) * 900.0);
        assert!((net.fluid_volume() - volume).abs() / volume < 1e-4);
        let density = config.fluid.model().properties(50.0).density;
        let expected = volume * density / 20.0;
        assert!((solver.transit_time() - expected).abs() / expected < 1e-4);
    }

    #[test]
    fn test_heat_extraction_run() {
        let config = small_config();
        let (net, grid) = setup(&config);
        let kernel = SbtKernel::new(config.numerics.accuracy);
        let ctx = KernelContext::new(&net, config.numerics.accuracy, grid.min_step());
        let tables = Arc::new(kernel.precompute(&ctx));
        let solver = TimeMarchingSolver::new(&config, &net, &grid, kernel, tables).unwrap();
        let transit = solver.transit_time();
        let run = solver.run().unwrap();
        assert_eq!(run.records.len(), 16);
        assert_eq!(run.records[0].time, 0.0);
        assert!(transit > grid.times()[1] && transit < grid.horizon());

        // The initial fluid is at rock temperature, cold near the surface
        assert!(run.records[0].produced_temperature < run.records[0].injection_temperature);
        for r in run.records.iter().filter(|r| r.time >= transit) {
            assert!(
                r.produced_temperature >= r.injection_temperature,
                "t = {}: {} < {}",
                r.time,
                r.produced_temperature,
                r.injection_temperature
            );
        }
        // Once steps are much longer than a transit the stored fluid heat is
        // small and the rock gives heat to the loop
        for (n, r) in run.records.iter().enumerate().skip(1) {
            if grid.step_length(n) > 2.0 * transit {
                assert!(r.heat_extraction > 0.0, "t = {}", r.time);
            }
        }
        let bottom = config.rock.temperature_at(config.geometry.junction_depth);
        for r in &run.records[1..] {
            assert!(r.produced_temperature < bottom, "t = {}", r.time);
            assert!(r.pressure_drop.friction > 0.0);
        }
    }

    #[test]
    fn test_produced_temperature_declines_late() {
        let run = run_sbt(&small_config());
        let n = run.records.len();
        let late = &run.records[n - 5..];
        for w in late.windows(2) {
            assert!(
                w[1].produced_temperature <= w[0].produced_temperature + 1e-9,
                "{} -> {}",
                w[0].produced_temperature,
                w[1].produced_temperature
            );
        }
    }

    #[test]
    fn test_implicitness_blend() {
        let mut config = small_config();
        config.time.final_timestep_count = 30;
        let implicit = run_sbt(&config);
        let n = implicit.records.len();
        for theta in [0.0, 0.5] {
            config.numerics.implicitness = theta;
            let run = run_sbt(&config);
            assert_eq!(run.records.len(), n);
            for (r, reference) in run.records[n - 10..].iter().zip(&implicit.records[n - 10..]) {
                let (t, t_ref) = (r.produced_temperature, reference.produced_temperature);
                assert!(
                    (t - t_ref).abs() / t_ref < 0.02,
                    "theta = {theta}, t = {}: {t} vs {t_ref}",
                    r.time
                );
            }
        }
    }

    #[test]
    fn test_gmres_matches_dense() {
        let config = small_config();
        let mut dense = config.clone();
        dense.numerics.linear_solver.kind = LinearSolverKind::Dense;
        let a = run_sbt(&config);
        let b = run_sbt(&dense);
        for (ra, rb) in a.records.iter().zip(&b.records) {
            assert!(
                (ra.produced_temperature - rb.produced_temperature).abs() < 1e-6,
                "{} vs {}",
                ra.produced_temperature,
                rb.produced_temperature
            );
        }
        assert!(a.records[1..].iter().all(|r| r.iterations > 0));
        assert!(b.records.iter().all(|r| r.iterations == 0));
    }

    #[test]
    fn test_stepwise_matches_run() {
        let config = small_config();
        let (net, grid) = setup(&config);
        let kernel = SbtKernel::new(1);
        let ctx = KernelContext::new(&net, 1, grid.min_step());
        let tables = Arc::new(kernel.precompute(&ctx));

        let mut solver =
            TimeMarchingSolver::new(&config, &net, &grid, kernel, tables.clone()).unwrap();
        let mut steps = 0;
        while let Some(record) = solver.step().unwrap() {
            steps += 1;
            assert_eq!(record.time, grid.times()[steps]);
        }
        assert_eq!(steps, grid.num_steps());
        assert!(solver.is_finished());
        assert_eq!(solver.history().len(), grid.num_steps() + 1);
        assert!(solver.history()[0].iter().all(|q| *q == 0.0));
        assert!(solver.step().unwrap().is_none());

        let stepped = solver.finish();
        let whole = TimeMarchingSolver::new(&config, &net, &grid, kernel, tables)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(stepped.records, whole.records);
        assert_eq!(stepped.regime_counts, whole.regime_counts);
        assert_eq!(
            stepped.regime_counts.total(),
            grid.num_steps() * (net.len() + net.num_interactions())
        );
    }

    #[test]
    fn test_energy_balance() {
        let mut config = small_config();
        config.fluid = FluidConfig::Constant {
            density: 1000.0,
            specific_heat: 4180.0,
            viscosity: 5e-4,
            conductivity: 0.6,
        };
        let (net, grid) = setup(&config);
        let kernel = SbtKernel::new(1);
        let ctx = KernelContext::new(&net, 1, grid.min_step());
        let tables = Arc::new(kernel.precompute(&ctx));
        let mut solver = TimeMarchingSolver::new(&config, &net, &grid, kernel, tables).unwrap();
        while solver.step().unwrap().is_some() {}

        // Late steps are long, storage is negligible
        let outlet = solver.outlet_temperatures()[net.wellhead_element()];
        let record = solver.records().last().unwrap();
        let advected = record.mass_flow * 4180.0 * (outlet - record.injection_temperature);
        let rel = (advected - record.heat_extraction).abs() / record.heat_extraction;
        assert!(rel < 0.02, "advected {advected} W, extracted {} W", record.heat_extraction);
    }

    #[test]
    fn test_line_source_kernel() {
        let config = small_config();
        let (net, grid) = setup(&config);
        let run = TimeMarchingSolver::new(&config, &net, &grid, LineSourceKernel, Arc::new(()))
            .unwrap()
            .run()
            .unwrap();
        let last = run.records.last().unwrap();
        assert!(last.produced_temperature > last.injection_temperature);
        assert_eq!(run.regime_counts.cylindrical, 0);
    }

    #[test]
    fn test_hot_rock_raises_physical_limit() {
        let mut config = small_config();
        config.rock.surface_temperature = 120.0;
        let run = run_sbt(&config);
        let limits: Vec<_> = run
            .warnings
            .iter()
            .filter(|w| !w.is_geometry_quality())
            .collect();
        assert!(!limits.is_empty());
        // At most one per step
        assert!(limits.len() <= run.records.len() - 1);
        let mut steps: Vec<usize> = limits
            .iter()
            .map(|w| match w {
                SimWarning::PhysicalLimit { step, temperature, .. } => {
                    assert!(*temperature >= 100.0);
                    *step
                }
                _ => unreachable!(),
            })
            .collect();
        let before = steps.len();
        steps.dedup();
        assert_eq!(steps.len(), before);
    }

    #[test]
    fn test_non_positive_flow_rate() {
        let mut config = small_config();
        config.operation.flow_rate = ProfileSource::Constant(0.0);
        let (net, grid) = setup(&config);
        let result = TimeMarchingSolver::new(&config, &net, &grid, LineSourceKernel, Arc::new(()));
        assert!(matches!(
            result,
            Err(SbtError::InvalidConfig {
                field: "operation.flow_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_solver_failure_names_step() {
        let mut config = small_config();
        let ls = &mut config.numerics.linear_solver;
        ls.max_iterations = 1;
        ls.restart = 1;
        ls.rel_tolerance = 1e-16;
        ls.abs_tolerance = 1e-16;
        let (net, grid) = setup(&config);
        let mut solver =
            TimeMarchingSolver::new(&config, &net, &grid, LineSourceKernel, Arc::new(())).unwrap();
        match solver.step() {
            Err(SbtError::LinearAlgebra { step, element, .. }) => {
                assert_eq!(step, 1);
                assert_eq!(element, None);
            }
            other => panic!("expected a linear algebra error, got {other:?}"),
        }
    }
}
