//! Point-list model of the closed-loop well network.
//!
//! Coordinates: x runs from the injector wellhead towards the producer
//! wellhead, y across, z up with the surface at z = 0.

use crate::Point;
use crate::sim::config::GeometryConfig;
use crate::sim::error::SbtError;

/// Ordered point lists of the well network, each in flow direction.
///
/// Every lateral starts at the injector's last point and ends at the
/// producer's first point.
#[derive(Debug, Clone, PartialEq)]
pub struct Wireframe {
    pub injector: Vec<Point>,
    pub laterals: Vec<Vec<Point>>,
    pub producer: Vec<Point>,
}

impl Wireframe {
    /// Builds the wireframe from geometry parameters.
    pub fn build(config: &GeometryConfig) -> Result<Self, SbtError> {
        let el = config.element_length;
        if !(el.is_finite() && el > 0.0) {
            return Err(SbtError::config(
                "geometry.element_length",
                format!("must be finite and > 0, found {el}"),
            ));
        }
        if config.num_laterals == 0 {
            return Err(SbtError::config("geometry.num_laterals", "must be >= 1"));
        }
        let lv = config.vertical_section_length;
        if !(lv.is_finite() && lv > 0.0) || (lv / el).round() < 1.0 {
            return Err(SbtError::config(
                "geometry.vertical_section_length",
                format!("{lv} m gives no element with element length {el} m"),
            ));
        }
        let dj = config.junction_depth;
        if !dj.is_finite() || dj < lv {
            return Err(SbtError::config(
                "geometry.junction_depth",
                format!("junction at {dj} m is above the vertical section end at {lv} m"),
            ));
        }
        let theta = config.inclination_angle;
        if !(0.0..90.0).contains(&theta) {
            return Err(SbtError::config(
                "geometry.inclination_angle",
                format!("must be in [0, 90) degrees, found {theta}"),
            ));
        }
        let de = config.lateral_endpoint_depth.unwrap_or(dj);
        if !de.is_finite() || de < dj {
            return Err(SbtError::config(
                "geometry.lateral_endpoint_depth",
                format!("lateral endpoint at {de} m is above the junction at {dj} m"),
            ));
        }
        let spacing = config.lateral_spacing;
        if config.num_laterals > 1 && !(spacing.is_finite() && spacing > 0.0) {
            return Err(SbtError::config(
                "geometry.lateral_spacing",
                format!("must be > 0 with several laterals, found {spacing}"),
            ));
        }

        let offsets = lateral_offsets(config.num_laterals, spacing);
        let xj = (dj - lv) * theta.to_radians().tan();
        let w = config.vertical_well_spacing;
        let max_stub = offsets
            .iter()
            .map(|y| stub_extent(*y, el))
            .fold(0.0, f64::max);
        if !w.is_finite() || w - 2.0 * xj - 2.0 * max_stub <= 0.0 {
            return Err(SbtError::config(
                "geometry.vertical_well_spacing",
                format!(
                    "{w} m leaves no room for the lateral stubs (needs more than {:.1} m)",
                    2.0 * (xj + max_stub)
                ),
            ));
        }

        let inj_kick = Point::new(0.0, 0.0, -lv);
        let inj_junction = Point::new(xj, 0.0, -dj);
        let prod_junction = Point::new(w - xj, 0.0, -dj);
        let prod_kick = Point::new(w, 0.0, -lv);

        let injector = polyline(&[Point::new(0.0, 0.0, 0.0), inj_kick, inj_junction], el);
        let producer = polyline(&[prod_junction, prod_kick, Point::new(w, 0.0, 0.0)], el);

        let laterals = offsets
            .iter()
            .map(|&y| {
                let stub = stub_extent(y, el);
                let a = Point::new(xj + stub, y, -dj);
                let m = Point::new(0.5 * w, y, -de);
                let b = Point::new(w - xj - stub, y, -dj);
                polyline(&[inj_junction, a, m, b, prod_junction], el)
            })
            .collect();

        Ok(Self {
            injector,
            laterals,
            producer,
        })
    }

    /// Terminal point of the injector.
    pub fn injector_junction(&self) -> Option<Point> {
        self.injector.last().copied()
    }

    /// Initial point of the producer.
    pub fn producer_junction(&self) -> Option<Point> {
        self.producer.first().copied()
    }

    /// Number of straight segments in the whole network.
    pub fn num_segments(&self) -> usize {
        let count = |pts: &Vec<Point>| pts.len().saturating_sub(1);
        count(&self.injector)
            + self.laterals.iter().map(count).sum::<usize>()
            + count(&self.producer)
    }
}

/// Cross-offsets of the laterals, centred on the wellhead line.
pub fn lateral_offsets(num_laterals: usize, spacing: f64) -> Vec<f64> {
    let centre = (num_laterals as f64 - 1.0) / 2.0;
    (0..num_laterals)
        .map(|l| (l as f64 - centre) * spacing)
        .collect()
}

fn stub_extent(offset: f64, element_length: f64) -> f64 {
    offset.abs().max(element_length)
}

/// Joins the corner points with straight legs split into elements.
///
/// Each leg gets `round(len / element_length)` equal segments, at least one
/// when the leg has a non-zero length. Zero-length legs are skipped.
fn polyline(corners: &[Point], element_length: f64) -> Vec<Point> {
    let mut points = vec![corners[0]];
    for leg in corners.windows(2) {
        let (a, b) = (leg[0], leg[1]);
        let len = a.distance(&b);
        if len <= f64::EPSILON * element_length {
            continue;
        }
        let n = ((len / element_length).round() as usize).max(1);
        points.extend((1..n).map(|i| Point::new_between_2_points(a, b, i as f64 / n as f64)));
        points.push(b);
    }
    points
}
