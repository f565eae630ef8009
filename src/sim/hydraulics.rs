//! Pipe-flow correlations: Reynolds number, friction, film heat transfer and
//! pressure drop along the network.

use std::f64::consts::PI;

use super::discretization::{DiscretizedNetwork, Element, ElementRole};
use super::fluid::FluidProperties;

/// Gravitational acceleration in m/s^2.
pub const GRAVITY: f64 = 9.81;
/// Upper Reynolds number of laminar pipe flow.
pub const LAMINAR_LIMIT: f64 = 2300.0;
/// Nusselt number of fully developed laminar flow at constant wall temperature.
pub const LAMINAR_NUSSELT: f64 = 3.66;

pub fn reynolds(mass_flow: f64, diameter: f64, viscosity: f64) -> f64 {
    4.0 * mass_flow.abs() / (PI * diameter * viscosity)
}

/// Darcy friction factor: `64 / Re` when laminar, Haaland otherwise.
pub fn darcy_friction_factor(re: f64, relative_roughness: f64) -> f64 {
    if re <= 0.0 {
        return 0.0;
    }
    if re < LAMINAR_LIMIT {
        return 64.0 / re;
    }
    let arg = (relative_roughness / 3.7).powf(1.11) + 6.9 / re;
    (-1.8 * arg.log10()).powi(-2)
}

/// Nusselt number: constant when laminar, Gnielinski otherwise.
pub fn nusselt(re: f64, pr: f64) -> f64 {
    if re < LAMINAR_LIMIT {
        return LAMINAR_NUSSELT;
    }
    // Petukhov smooth-pipe friction
    let f = (0.79 * re.ln() - 1.64).powi(-2);
    let nu = (f / 8.0) * (re - 1000.0) * pr
        / (1.0 + 12.7 * (f / 8.0).sqrt() * (pr.powf(2.0 / 3.0) - 1.0));
    nu.max(LAMINAR_NUSSELT)
}

/// Fluid-to-wall thermal resistance per unit length, in m*K/W.
pub fn film_resistance(mass_flow: f64, diameter: f64, props: &FluidProperties) -> f64 {
    let re = reynolds(mass_flow, diameter, props.viscosity);
    let h = nusselt(re, props.prandtl()) * props.conductivity / diameter;
    1.0 / (PI * diameter * h)
}

/// Pressure drop components in Pa (positive: the pump must supply it).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PressureDrop {
    pub friction: f64,
    pub hydrostatic: f64,
}

impl PressureDrop {
    fn scaled(self, w: f64) -> Self {
        Self {
            friction: w * self.friction,
            hydrostatic: w * self.hydrostatic,
        }
    }
}

impl std::ops::AddAssign for PressureDrop {
    fn add_assign(&mut self, other: Self) {
        self.friction += other.friction;
        self.hydrostatic += other.hydrostatic;
    }
}

pub fn element_pressure_drop(
    element: &Element,
    mass_flow: f64,
    props: &FluidProperties,
    roughness: f64,
) -> PressureDrop {
    let d = element.diameter();
    let area = 0.25 * PI * d * d;
    let velocity = mass_flow / (props.density * area);
    let re = reynolds(mass_flow, d, props.viscosity);
    let f = darcy_friction_factor(re, roughness / d);
    PressureDrop {
        friction: f * element.length / d * 0.5 * props.density * velocity * velocity,
        hydrostatic: props.density * GRAVITY * element.rise(),
    }
}

/// Pressure drop from the injection wellhead to the production wellhead.
///
/// Laterals run in parallel, so their drops are averaged with the flow
/// fractions as weights. `props` holds the fluid properties per element.
pub fn network_pressure_drop(
    network: &DiscretizedNetwork,
    total_mass_flow: f64,
    props: &[FluidProperties],
    roughness: f64,
) -> PressureDrop {
    let mut drop = PressureDrop::default();
    for (i, e) in network.elements.iter().enumerate() {
        let m = total_mass_flow * e.flow_share;
        let de = element_pressure_drop(e, m, &props[i], roughness);
        match e.role {
            ElementRole::Lateral(l) => drop += de.scaled(network.flow_fractions[l]),
            ElementRole::Injector | ElementRole::Producer => drop += de,
        }
    }
    drop
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::wireframe::Wireframe;
    use crate::sim::config::SbtConfig;
    use crate::sim::discretization::discretize;
    use crate::sim::fluid::{FluidModel, Water};

    #[test]
    fn test_friction_factor_regimes() {
        assert!((darcy_friction_factor(1000.0, 0.0) - 0.064).abs() < 1e-12);
        // Smooth pipe at Re = 1e5: Blasius gives about 0.018
        let f = darcy_friction_factor(1e5, 0.0);
        assert!((f - 0.018).abs() < 0.001, "f = {f}");
        assert!(darcy_friction_factor(1e5, 1e-3) > f);
    }

    #[test]
    fn test_nusselt() {
        assert_eq!(nusselt(1000.0, 5.0), LAMINAR_NUSSELT);
        // Dittus-Boelter estimate 0.023 Re^0.8 Pr^0.4 at Re = 1e5, Pr = 3
        let nu = nusselt(1e5, 3.0);
        let db = 0.023 * 1e5f64.powf(0.8) * 3f64.powf(0.4);
        assert!((nu - db).abs() / db < 0.2, "Nu = {nu}, DB = {db}");
    }

    #[test]
    fn test_film_resistance_turbulent_is_small() {
        let props = Water.properties(60.0);
        let r = film_resistance(20.0, 0.3, &props);
        assert!(r > 0.0 && r < 1e-3, "R = {r}");
    }

    #[test]
    fn test_network_pressure_drop() {
        let config = SbtConfig::default();
        let wf = Wireframe::build(&config.geometry).unwrap();
        let net = discretize(&wf, &config, config.time.horizon_seconds()).unwrap();
        let props = vec![Water.properties(50.0); net.len()];
        let drop = network_pressure_drop(&net, 20.0, &props, config.wellbore.roughness);
        assert!(drop.friction > 0.0);
        // Same density everywhere: the loop starts and ends at the surface
        assert!(drop.hydrostatic.abs() < 1e-6 * props[0].density * GRAVITY * 2050.0);

        // Hot producer column gives a thermosiphon
        let mut hot = props.clone();
        for p in &mut hot[net.producer_range.clone()] {
            *p = Water.properties(90.0);
        }
        let drop = network_pressure_drop(&net, 20.0, &hot, config.wellbore.roughness);
        assert!(drop.hydrostatic < 0.0);
    }
}
