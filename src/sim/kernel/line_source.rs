//! Classic infinite line source kernel, without precomputed tables.

use super::sbt::{infinite_line, point_source};
use super::{KernelArgs, KernelContext, Regime, ThermalKernel};

/// Self response from the infinite line source at the wall, neighbours as
/// point sources at their midpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineSourceKernel;

impl ThermalKernel for LineSourceKernel {
    type Tables = ();

    fn precompute(&self, _context: &KernelContext) {}

    fn evaluate(&self, _tables: &(), args: &KernelArgs<'_>) -> f64 {
        match *args {
            KernelArgs::SelfResponse { element, elapsed } => {
                if elapsed <= 0.0 {
                    return 0.0;
                }
                let alpha_t = element.rock.diffusivity() * elapsed;
                infinite_line(element.radius, element.rock.conductivity, alpha_t)
            }
            KernelArgs::Neighbor {
                source,
                spacing,
                elapsed,
                ..
            } => {
                if elapsed <= 0.0 {
                    return 0.0;
                }
                let alpha_t = source.rock.diffusivity() * elapsed;
                point_source(
                    source.length,
                    spacing.max(source.radius),
                    source.rock.conductivity,
                    alpha_t,
                )
            }
        }
    }

    fn classify(&self, args: &KernelArgs<'_>) -> (Regime, bool) {
        match args {
            KernelArgs::SelfResponse { .. } => (Regime::InfiniteLine, false),
            KernelArgs::Neighbor { .. } => (Regime::PointSource, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use crate::sim::config::RockProperties;
    use crate::sim::discretization::{Element, ElementRole};
    use crate::sim::kernel::sbt::SbtKernel;

    fn vertical(z0: f64) -> Element {
        let start = Point::new(0.0, 0.0, z0);
        let end = Point::new(0.0, 0.0, z0 - 50.0);
        Element {
            role: ElementRole::Producer,
            start,
            end,
            midpoint: Point::midpoint(start, end),
            direction: (end - start).normalize().unwrap(),
            length: 50.0,
            radius: 0.15,
            flow_share: 1.0,
            rock_temperature: 80.0,
            outlet_rock_temperature: 80.0,
            rock: RockProperties::default(),
        }
    }

    #[test]
    fn test_agrees_with_sbt_in_line_regime() {
        let e = vertical(-1000.0);
        let ctx = KernelContext {
            accuracy: 1,
            alpha_min: e.rock.diffusivity(),
            dt_min: 100.0,
            r_max: e.radius,
        };
        // Fo = 100, far from the element ends
        let elapsed = 100.0 * e.radius.powi(2) / e.rock.diffusivity();
        let args = KernelArgs::SelfResponse {
            element: &e,
            elapsed,
        };
        let ls = LineSourceKernel.evaluate(&(), &args);
        let sbt = SbtKernel::new(1);
        let tables = sbt.precompute(&ctx);
        let g = sbt.evaluate(&tables, &args);
        assert!((ls - g).abs() / g < 1e-9, "line {ls}, sbt {g}");
        assert_eq!(LineSourceKernel.classify(&args), (Regime::InfiniteLine, false));
    }

    #[test]
    fn test_line_source_grows_without_bound() {
        let e = vertical(-1000.0);
        let at = |t: f64| {
            LineSourceKernel.evaluate(
                &(),
                &KernelArgs::SelfResponse {
                    element: &e,
                    elapsed: t,
                },
            )
        };
        assert!(at(1e10) > at(1e9));
        assert!(at(1e12) > 0.4);
        assert_eq!(at(0.0), 0.0);
    }
}
