//! Fluid property models for the circulating fluid.

use serde::{Deserialize, Serialize};

use super::error::SbtError;

/// Thermophysical properties of the fluid at one state point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidProperties {
    /// Density in kg/m^3.
    pub density: f64,
    /// Specific heat capacity in J/(kg*K).
    pub specific_heat: f64,
    /// Dynamic viscosity in Pa*s.
    pub viscosity: f64,
    /// Thermal conductivity in W/(m*K).
    pub conductivity: f64,
}

impl FluidProperties {
    /// Prandtl number.
    pub fn prandtl(&self) -> f64 {
        self.specific_heat * self.viscosity / self.conductivity
    }
}

/// Source of fluid properties as a function of temperature (C).
pub trait FluidModel {
    fn properties(&self, temperature: f64) -> FluidProperties;
}

/// Constant properties, independent of temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantFluid(pub FluidProperties);

impl FluidModel for ConstantFluid {
    fn properties(&self, _temperature: f64) -> FluidProperties {
        self.0
    }
}

/// Liquid water correlations.
///
/// The fits hold for liquid water at moderate pressure. Temperatures are
/// clamped to `[WATER_T_MIN, WATER_T_MAX]` before evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Water;

pub const WATER_T_MIN: f64 = 1.0;
pub const WATER_T_MAX: f64 = 180.0;

impl FluidModel for Water {
    fn properties(&self, temperature: f64) -> FluidProperties {
        let t = temperature.clamp(WATER_T_MIN, WATER_T_MAX);
        FluidProperties {
            density: 1001.1 - 0.0867 * t - 0.0035 * t * t,
            specific_heat: 4217.0 - 2.0 * t + 0.02 * t * t,
            // Vogel-type fit
            viscosity: 2.414e-5 * 10f64.powf(247.8 / (t + 133.15)),
            conductivity: 0.5636 + 1.946e-3 * t - 8.151e-6 * t * t,
        }
    }
}

/// Fluid model selection in the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FluidConfig {
    Constant {
        density: f64,
        specific_heat: f64,
        viscosity: f64,
        conductivity: f64,
    },
    #[default]
    Water,
}

impl FluidConfig {
    pub(crate) fn validate(&self) -> Result<(), SbtError> {
        if let FluidConfig::Constant {
            density,
            specific_heat,
            viscosity,
            conductivity,
        } = self
        {
            let all_positive = [density, specific_heat, viscosity, conductivity]
                .iter()
                .all(|v| v.is_finite() && **v > 0.0);
            if !all_positive {
                return Err(SbtError::config(
                    "fluid",
                    "constant properties must be finite and > 0",
                ));
            }
        }
        Ok(())
    }

    /// Builds the model described by this configuration.
    pub fn model(&self) -> Box<dyn FluidModel + Send + Sync> {
        match *self {
            FluidConfig::Constant {
                density,
                specific_heat,
                viscosity,
                conductivity,
            } => Box::new(ConstantFluid(FluidProperties {
                density,
                specific_heat,
                viscosity,
                conductivity,
            })),
            FluidConfig::Water => Box::new(Water),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_room_temperature() {
        let p = Water.properties(20.0);
        assert!((p.density - 998.0).abs() < 2.0, "density = {}", p.density);
        assert!((p.specific_heat - 4185.0).abs() < 10.0, "cp = {}", p.specific_heat);
        assert!((p.viscosity - 1.0e-3).abs() < 0.05e-3, "mu = {}", p.viscosity);
        assert!((p.conductivity - 0.60).abs() < 0.01, "k = {}", p.conductivity);
    }

    #[test]
    fn test_water_trends() {
        let cold = Water.properties(20.0);
        let hot = Water.properties(90.0);
        assert!(hot.density < cold.density);
        assert!(hot.viscosity < cold.viscosity);
        assert!(hot.conductivity > cold.conductivity);
        assert!(hot.prandtl() < cold.prandtl());
    }

    #[test]
    fn test_water_clamped() {
        assert_eq!(Water.properties(-20.0), Water.properties(WATER_T_MIN));
        assert_eq!(Water.properties(400.0), Water.properties(WATER_T_MAX));
    }

    #[test]
    fn test_fluid_config_json() {
        let cfg: FluidConfig = serde_json::from_str(
            r#"{"model": "constant", "density": 1000.0, "specific_heat": 4200.0,
                "viscosity": 0.0005, "conductivity": 0.65}"#,
        )
        .unwrap();
        assert!(cfg.validate().is_ok());
        let p = cfg.model().properties(123.0);
        assert_eq!(p.density, 1000.0);
        assert_eq!(p.specific_heat, 4200.0);

        let cfg: FluidConfig = serde_json::from_str(r#"{"model": "water"}"#).unwrap();
        assert_eq!(cfg, FluidConfig::Water);
    }

    #[test]
    fn test_constant_rejects_zero() {
        let cfg = FluidConfig::Constant {
            density: 1000.0,
            specific_heat: 0.0,
            viscosity: 1e-3,
            conductivity: 0.6,
        };
        assert!(cfg.validate().is_err());
    }
}
