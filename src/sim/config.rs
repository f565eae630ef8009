//! Run configuration: nested parameter structs, JSON loading and validation.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::SbtError;
use super::fluid::FluidConfig;
use super::profile::ProfileSource;

/// Seconds in one (365-day) simulation year.
pub const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

/// Geometry of the closed-loop well network.
///
/// Depths and lengths in m, angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Number of laterals connecting the injector and producer junctions.
    pub num_laterals: usize,
    /// Horizontal spacing between neighbouring laterals.
    pub lateral_spacing: f64,
    /// Target element length used to split every straight leg.
    pub element_length: f64,
    /// Depth of the injector and producer junctions.
    pub junction_depth: f64,
    /// Length of the vertical run below each wellhead.
    pub vertical_section_length: f64,
    /// Inclination of the transition section, measured from vertical.
    pub inclination_angle: f64,
    /// Horizontal distance between the injector and producer wellheads.
    pub vertical_well_spacing: f64,
    /// Depth reached by the laterals half-way between the junctions.
    ///
    /// `None` keeps the laterals horizontal at the junction depth.
    pub lateral_endpoint_depth: Option<f64>,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            num_laterals: 1,
            lateral_spacing: 100.0,
            element_length: 50.0,
            junction_depth: 2050.0,
            vertical_section_length: 2000.0,
            inclination_angle: 45.0,
            vertical_well_spacing: 1000.0,
            lateral_endpoint_depth: None,
        }
    }
}

/// Wellbore dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellboreConfig {
    /// Diameter of the injector and producer, in m.
    pub vertical_diameter: f64,
    /// Diameter of the laterals, in m.
    pub lateral_diameter: f64,
    /// Absolute pipe roughness, in m.
    pub roughness: f64,
}

impl Default for WellboreConfig {
    fn default() -> Self {
        Self {
            vertical_diameter: 0.3,
            lateral_diameter: 0.25,
            roughness: 1e-4,
        }
    }
}

/// Thermal properties of the rock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RockProperties {
    /// Thermal conductivity in W/(m*K).
    pub conductivity: f64,
    /// Density in kg/m^3.
    pub density: f64,
    /// Specific heat capacity in J/(kg*K).
    pub specific_heat: f64,
}

impl RockProperties {
    /// Thermal diffusivity in m^2/s.
    pub fn diffusivity(&self) -> f64 {
        self.conductivity / (self.density * self.specific_heat)
    }
}

impl Default for RockProperties {
    fn default() -> Self {
        Self {
            conductivity: 2.83,
            density: 2875.0,
            specific_heat: 825.0,
        }
    }
}

/// Depth interval with its own rock properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoilerZone {
    pub top_depth: f64,
    pub bottom_depth: f64,
    pub properties: RockProperties,
}

/// Rock description: undisturbed temperature field and thermal properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RockConfig {
    /// Ground surface temperature in C.
    pub surface_temperature: f64,
    /// Geothermal gradient in C/m.
    pub geothermal_gradient: f64,
    pub properties: RockProperties,
    pub boiler: Option<BoilerZone>,
}

impl RockConfig {
    /// Undisturbed rock temperature at `depth` (m).
    pub fn temperature_at(&self, depth: f64) -> f64 {
        self.surface_temperature + self.geothermal_gradient * depth
    }

    /// Rock properties at `depth`: the boiler zone's if it contains the depth.
    pub fn properties_at(&self, depth: f64) -> RockProperties {
        match self.boiler {
            Some(zone) if depth >= zone.top_depth && depth <= zone.bottom_depth => zone.properties,
            _ => self.properties,
        }
    }

    /// Largest diffusivity present in the rock description.
    pub fn max_diffusivity(&self) -> f64 {
        let base = self.properties.diffusivity();
        self.boiler
            .map_or(base, |zone| base.max(zone.properties.diffusivity()))
    }
}

impl Default for RockConfig {
    fn default() -> Self {
        Self {
            surface_temperature: 15.0,
            geothermal_gradient: 0.05,
            properties: RockProperties::default(),
            boiler: None,
        }
    }
}

/// Operating conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationConfig {
    /// Total mass flow rate in kg/s.
    pub flow_rate: ProfileSource,
    /// Injection temperature in C.
    pub injection_temperature: ProfileSource,
    /// Share of the total flow taken by each lateral. Uniform when `None`.
    pub lateral_flow_fractions: Option<Vec<f64>>,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            flow_rate: ProfileSource::Constant(20.0),
            injection_temperature: ProfileSource::Constant(50.0),
            lateral_flow_fractions: None,
        }
    }
}

/// Time-stepping control.
///
/// The grid is dense (uniform) up to `transition_time` and log-spaced after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Simulation horizon in years.
    pub horizon_years: f64,
    /// Number of uniform steps before the transition time.
    pub initial_timestep_count: usize,
    /// Number of log-spaced steps after the transition time.
    pub final_timestep_count: usize,
    /// Time separating the uniform and log-spaced periods, in s.
    pub transition_time: f64,
}

impl TimeConfig {
    pub fn horizon_seconds(&self) -> f64 {
        self.horizon_years * SECONDS_PER_YEAR
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            horizon_years: 30.0,
            initial_timestep_count: 5,
            final_timestep_count: 70,
            transition_time: 9900.0,
        }
    }
}

/// Heat-response kernel used by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    /// Adaptive slender-body kernel with precomputed tables.
    Sbt,
    /// Infinite line source for the self response, point sources for neighbours.
    LineSource,
}

/// Linear solver used for the per-step system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    /// Restarted GMRES with a block forward-sweep preconditioner.
    Gmres,
    /// Dense Gaussian elimination with partial pivoting.
    Dense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSolverConfig {
    pub kind: LinearSolverKind,
    /// Maximum number of GMRES iterations per time step.
    pub max_iterations: usize,
    /// Krylov subspace size before a restart.
    pub restart: usize,
    /// Relative residual tolerance.
    pub rel_tolerance: f64,
    /// Absolute residual tolerance.
    pub abs_tolerance: f64,
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            kind: LinearSolverKind::Gmres,
            max_iterations: 500,
            restart: 50,
            rel_tolerance: 1e-10,
            abs_tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericsConfig {
    /// Accuracy level 1 (fast) to 5 (fine tables, strict thresholds).
    pub accuracy: u8,
    /// Implicit/explicit blend of the heat term in the fluid balance (1 = implicit).
    pub implicitness: f64,
    pub kernel: KernelKind,
    /// Neighbours with `spacing / length` above this ratio are ignored.
    ///
    /// `None` derives the cutoff from the heat arrival radius at the horizon.
    pub neighbor_cutoff_ratio: Option<f64>,
    /// Allowed distance between lateral endpoints and the junctions, in m.
    pub connection_tolerance: f64,
    pub linear_solver: LinearSolverConfig,
}

impl Default for NumericsConfig {
    fn default() -> Self {
        Self {
            accuracy: 1,
            implicitness: 1.0,
            kernel: KernelKind::Sbt,
            neighbor_cutoff_ratio: None,
            connection_tolerance: 1e-3,
            linear_solver: LinearSolverConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Samples per year of the projected (uniform) output grid.
    pub time_steps_per_year: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            time_steps_per_year: 1,
        }
    }
}

/// Fully specified input of one simulation run.
///
/// The struct is immutable for the duration of a run and passed by reference
/// to every component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SbtConfig {
    pub geometry: GeometryConfig,
    pub wellbore: WellboreConfig,
    pub rock: RockConfig,
    pub fluid: FluidConfig,
    pub operation: OperationConfig,
    pub time: TimeConfig,
    pub numerics: NumericsConfig,
    pub output: OutputConfig,
}

impl SbtConfig {
    /// Parses a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse SBT configuration")
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: SbtConfig = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse SBT configuration: {}", path.display()))?;
        Ok(config)
    }

    /// Checks value ranges that do not depend on the geometry.
    ///
    /// Geometry parameters are checked by the wireframe builder.
    pub fn validate(&self) -> Result<(), SbtError> {
        let w = &self.wellbore;
        positive("wellbore.vertical_diameter", w.vertical_diameter)?;
        positive("wellbore.lateral_diameter", w.lateral_diameter)?;
        if !(w.roughness >= 0.0) {
            return Err(SbtError::config("wellbore.roughness", "must be >= 0"));
        }

        let rock = &self.rock;
        finite("rock.surface_temperature", rock.surface_temperature)?;
        finite("rock.geothermal_gradient", rock.geothermal_gradient)?;
        validate_rock("rock.properties", &rock.properties)?;
        if let Some(zone) = &rock.boiler {
            validate_rock("rock.boiler.properties", &zone.properties)?;
            if !(zone.bottom_depth > zone.top_depth) {
                return Err(SbtError::config(
                    "rock.boiler",
                    "bottom_depth must be below top_depth",
                ));
            }
        }

        self.fluid.validate()?;

        if let Some(fractions) = &self.operation.lateral_flow_fractions {
            if fractions.len() != self.geometry.num_laterals {
                return Err(SbtError::FlowFractionMismatch {
                    expected: self.geometry.num_laterals,
                    found: fractions.len(),
                });
            }
        }

        let t = &self.time;
        positive("time.horizon_years", t.horizon_years)?;
        positive("time.transition_time", t.transition_time)?;
        if t.initial_timestep_count == 0 {
            return Err(SbtError::config("time.initial_timestep_count", "must be >= 1"));
        }
        if t.final_timestep_count == 0 {
            return Err(SbtError::config("time.final_timestep_count", "must be >= 1"));
        }
        if t.transition_time >= t.horizon_seconds() {
            return Err(SbtError::config(
                "time.transition_time",
                format!(
                    "{} s must be shorter than the horizon ({} s)",
                    t.transition_time,
                    t.horizon_seconds()
                ),
            ));
        }

        let n = &self.numerics;
        if !(1..=5).contains(&n.accuracy) {
            return Err(SbtError::config(
                "numerics.accuracy",
                format!("must be between 1 and 5, found {}", n.accuracy),
            ));
        }
        if !(0.0..=1.0).contains(&n.implicitness) {
            return Err(SbtError::config(
                "numerics.implicitness",
                format!("must be in [0, 1], found {}", n.implicitness),
            ));
        }
        if let Some(ratio) = n.neighbor_cutoff_ratio {
            positive("numerics.neighbor_cutoff_ratio", ratio)?;
        }
        positive("numerics.connection_tolerance", n.connection_tolerance)?;
        let ls = &n.linear_solver;
        if ls.max_iterations == 0 || ls.restart == 0 {
            return Err(SbtError::config(
                "numerics.linear_solver",
                "max_iterations and restart must be >= 1",
            ));
        }

        if self.output.time_steps_per_year == 0 {
            return Err(SbtError::config("output.time_steps_per_year", "must be >= 1"));
        }
        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), SbtError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SbtError::config(field, format!("must be finite, found {value}")))
    }
}

pub(crate) fn positive(field: &'static str, value: f64) -> Result<(), SbtError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SbtError::config(field, format!("must be > 0, found {value}")))
    }
}

fn validate_rock(field: &'static str, props: &RockProperties) -> Result<(), SbtError> {
    if props.conductivity > 0.0 && props.density > 0.0 && props.specific_heat > 0.0 {
        Ok(())
    } else {
        Err(SbtError::config(
            field,
            "conductivity, density and specific heat must be > 0",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SbtConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.time.horizon_seconds() - 30.0 * SECONDS_PER_YEAR).abs() < 1e-6);
    }

    #[test]
    fn test_json_partial_config_uses_defaults() {
        let json = r#"{
            "geometry": { "num_laterals": 3, "element_length": 25.0 },
            "operation": { "flow_rate": { "constant": 30.0 } },
            "numerics": { "accuracy": 3, "kernel": "line_source" }
        }"#;
        let config = SbtConfig::from_json_str(json).unwrap();
        assert_eq!(config.geometry.num_laterals, 3);
        assert_eq!(config.geometry.element_length, 25.0);
        assert_eq!(config.geometry.junction_depth, 2050.0);
        assert_eq!(config.operation.flow_rate, ProfileSource::Constant(30.0));
        assert_eq!(config.numerics.kernel, KernelKind::LineSource);
        assert_eq!(config.numerics.accuracy, 3);
    }

    #[test]
    fn test_json_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = SbtConfig::default();
        config.rock.boiler = Some(BoilerZone {
            top_depth: 1500.0,
            bottom_depth: 2100.0,
            properties: RockProperties {
                conductivity: 3.5,
                ..RockProperties::default()
            },
        });
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = SbtConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SbtConfig::from_json_file(Path::new("/nonexistent/sbt.json")).unwrap_err();
        assert!(format!("{err}").contains("/nonexistent/sbt.json"));
    }

    #[test]
    fn test_validate_rejects_bad_accuracy() {
        let mut config = SbtConfig::default();
        config.numerics.accuracy = 6;
        assert!(matches!(
            config.validate(),
            Err(SbtError::InvalidConfig {
                field: "numerics.accuracy",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_fraction_count() {
        let mut config = SbtConfig::default();
        config.geometry.num_laterals = 2;
        config.operation.lateral_flow_fractions = Some(vec![0.2, 0.3, 0.5]);
        assert!(matches!(
            config.validate(),
            Err(SbtError::FlowFractionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_validate_rejects_transition_after_horizon() {
        let mut config = SbtConfig::default();
        config.time.horizon_years = 1e-4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rock_boiler_zone() {
        let mut rock = RockConfig::default();
        let hot = RockProperties {
            conductivity: 4.0,
            ..RockProperties::default()
        };
        rock.boiler = Some(BoilerZone {
            top_depth: 1000.0,
            bottom_depth: 2000.0,
            properties: hot,
        });
        assert_eq!(rock.properties_at(500.0), rock.properties);
        assert_eq!(rock.properties_at(1500.0), hot);
        assert_eq!(rock.max_diffusivity(), hot.diffusivity());
        assert!((rock.temperature_at(1000.0) - 65.0).abs() < 1e-12);
    }
}
