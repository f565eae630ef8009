//! Splits the wireframe into line elements and builds their spacing structure.

use std::f64::consts::PI;
use std::ops::Range;

use super::config::{RockProperties, SbtConfig};
use super::error::{LateralEnd, SbtError, SimWarning};
use super::kernel::AccuracySettings;
use crate::geom::wireframe::Wireframe;
use crate::{Point, Vector};

/// Elements shorter than this many radii trigger a warning.
const MIN_SLENDER_RATIO: f64 = 10.0;
/// Largest relative length change between an element and its upstream element.
const MAX_LENGTH_JUMP: f64 = 0.6;
/// Tolerance on the sum of user-supplied lateral flow fractions.
const FRACTION_SUM_TOL: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRole {
    Injector,
    Lateral(usize),
    Producer,
}

/// Straight segment of the well network.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub role: ElementRole,
    pub start: Point,
    pub end: Point,
    pub midpoint: Point,
    /// Unit vector from `start` to `end`.
    pub direction: Vector,
    pub length: f64,
    pub radius: f64,
    /// Share of the total mass flow passing through the element.
    pub flow_share: f64,
    /// Undisturbed rock temperature at the midpoint depth.
    pub rock_temperature: f64,
    /// Undisturbed rock temperature at the outlet node depth.
    pub outlet_rock_temperature: f64,
    pub rock: RockProperties,
}

impl Element {
    pub fn diameter(&self) -> f64 {
        2.0 * self.radius
    }

    /// Elevation gain from inlet to outlet, in m.
    pub fn rise(&self) -> f64 {
        self.end.z - self.start.z
    }
}

/// Where an element takes its inlet fluid from.
#[derive(Debug, Clone, PartialEq)]
pub enum Inlet {
    /// Injection wellhead.
    Injection,
    /// Outlet of one upstream element.
    Single(usize),
    /// Flow-weighted mix of several upstream outlets, weights summing to 1.
    Merge(Vec<(usize, f64)>),
}

impl Inlet {
    /// Upstream elements with their flow weights.
    pub fn upstream(&self) -> Vec<(usize, f64)> {
        match self {
            Inlet::Injection => Vec::new(),
            Inlet::Single(j) => vec![(*j, 1.0)],
            Inlet::Merge(sources) => sources.clone(),
        }
    }
}

/// Symmetric matrix of distances between element midpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacingMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SpacingMatrix {
    pub fn new(elements: &[Element]) -> Self {
        let n = elements.len();
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = elements[i].midpoint.distance(&elements[j].midpoint);
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }
        Self { n, data }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }
}

/// Other elements of one element, nearest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedNeighbors {
    pub order: Vec<usize>,
    /// Index into `order` where the truncated far neighbours begin.
    pub far_start: usize,
}

impl SortedNeighbors {
    /// Neighbours that interact with the element.
    pub fn near(&self) -> &[usize] {
        &self.order[..self.far_start]
    }
}

/// Discretized well network, immutable for the rest of the run.
#[derive(Debug, Clone)]
pub struct DiscretizedNetwork {
    /// Elements in flow order: injector, laterals, producer.
    pub elements: Vec<Element>,
    pub spacing: SpacingMatrix,
    pub neighbors: Vec<SortedNeighbors>,
    pub inlets: Vec<Inlet>,
    /// Normalised lateral flow fractions.
    pub flow_fractions: Vec<f64>,
    pub injector_range: Range<usize>,
    pub lateral_ranges: Vec<Range<usize>>,
    pub producer_range: Range<usize>,
    pub warnings: Vec<SimWarning>,
}

impl DiscretizedNetwork {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Index of the last producer element (at the wellhead).
    pub fn wellhead_element(&self) -> usize {
        self.producer_range.end - 1
    }

    /// Fluid volume of the whole loop, in m3.
    pub fn fluid_volume(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| PI * e.radius * e.radius * e.length)
            .sum()
    }

    /// Total number of near-neighbour interactions.
    pub fn num_interactions(&self) -> usize {
        self.neighbors.iter().map(|n| n.far_start).sum()
    }
}

/// Discretizes the wireframe for a run of length `horizon` (s).
pub fn discretize(
    wireframe: &Wireframe,
    config: &SbtConfig,
    horizon: f64,
) -> Result<DiscretizedNetwork, SbtError> {
    let num_laterals = wireframe.laterals.len();
    if num_laterals == 0 {
        return Err(SbtError::config("geometry.num_laterals", "must be >= 1"));
    }
    let flow_fractions =
        normalized_fractions(config.operation.lateral_flow_fractions.as_deref(), num_laterals)?;
    check_connections(wireframe, config.numerics.connection_tolerance)?;

    let r_vertical = 0.5 * config.wellbore.vertical_diameter;
    let r_lateral = 0.5 * config.wellbore.lateral_diameter;

    let mut elements = Vec::with_capacity(wireframe.num_segments());
    push_elements(
        &mut elements,
        &wireframe.injector,
        ElementRole::Injector,
        r_vertical,
        1.0,
        config,
    )?;
    let injector_range = 0..elements.len();

    let mut lateral_ranges = Vec::with_capacity(num_laterals);
    for (l, points) in wireframe.laterals.iter().enumerate() {
        let first = elements.len();
        push_elements(
            &mut elements,
            points,
            ElementRole::Lateral(l),
            r_lateral,
            flow_fractions[l],
            config,
        )?;
        lateral_ranges.push(first..elements.len());
    }

    let first = elements.len();
    push_elements(
        &mut elements,
        &wireframe.producer,
        ElementRole::Producer,
        r_vertical,
        1.0,
        config,
    )?;
    let producer_range = first..elements.len();

    if injector_range.is_empty() || producer_range.is_empty() {
        return Err(SbtError::config(
            "geometry",
            "injector and producer need at least one element each",
        ));
    }

    let inlets = flow_topology(&injector_range, &lateral_ranges, &producer_range, &flow_fractions);
    let warnings = quality_warnings(&elements, &inlets);

    let spacing = SpacingMatrix::new(&elements);
    let cutoff = match config.numerics.neighbor_cutoff_ratio {
        Some(ratio) => Cutoff::Ratio(ratio),
        None => {
            let settings = AccuracySettings::for_level(config.numerics.accuracy);
            Cutoff::Radius(
                (config.rock.max_diffusivity() * horizon / settings.arrival_time).sqrt(),
            )
        }
    };
    let neighbors = sort_neighbors(&elements, &spacing, cutoff);

    tracing::info!(
        "discretized {} elements ({} laterals), {} near interactions",
        elements.len(),
        num_laterals,
        neighbors.iter().map(|n| n.far_start).sum::<usize>()
    );
    for w in &warnings {
        w.log();
    }

    Ok(DiscretizedNetwork {
        elements,
        spacing,
        neighbors,
        inlets,
        flow_fractions,
        injector_range,
        lateral_ranges,
        producer_range,
        warnings,
    })
}

/// Validates user fractions (or makes uniform ones) and normalises them.
pub fn normalized_fractions(
    fractions: Option<&[f64]>,
    num_laterals: usize,
) -> Result<Vec<f64>, SbtError> {
    let Some(fractions) = fractions else {
        return Ok(vec![1.0 / num_laterals as f64; num_laterals]);
    };
    if fractions.len() != num_laterals {
        return Err(SbtError::FlowFractionMismatch {
            expected: num_laterals,
            found: fractions.len(),
        });
    }
    if fractions.iter().any(|f| !(f.is_finite() && *f > 0.0)) {
        return Err(SbtError::config(
            "operation.lateral_flow_fractions",
            "every fraction must be > 0",
        ));
    }
    let sum: f64 = fractions.iter().sum();
    if (sum - 1.0).abs() > FRACTION_SUM_TOL {
        return Err(SbtError::config(
            "operation.lateral_flow_fractions",
            format!("fractions sum to {sum}, expected 1"),
        ));
    }
    Ok(fractions.iter().map(|f| f / sum).collect())
}

fn check_connections(wireframe: &Wireframe, tolerance: f64) -> Result<(), SbtError> {
    let (Some(ji), Some(jp)) = (wireframe.injector_junction(), wireframe.producer_junction())
    else {
        return Err(SbtError::config("geometry", "injector and producer must not be empty"));
    };
    for (l, points) in wireframe.laterals.iter().enumerate() {
        if points.len() < 2 {
            return Err(SbtError::config(
                "geometry",
                format!("lateral {l} needs at least two points"),
            ));
        }
        let start = points[0].distance(&ji);
        if start > tolerance {
            return Err(SbtError::GeometryMismatch {
                lateral: l,
                end: LateralEnd::Start,
                distance: start,
            });
        }
        let end = points[points.len() - 1].distance(&jp);
        if end > tolerance {
            return Err(SbtError::GeometryMismatch {
                lateral: l,
                end: LateralEnd::End,
                distance: end,
            });
        }
    }
    Ok(())
}

fn push_elements(
    elements: &mut Vec<Element>,
    points: &[Point],
    role: ElementRole,
    radius: f64,
    flow_share: f64,
    config: &SbtConfig,
) -> Result<(), SbtError> {
    for pair in points.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let axis = end - start;
        let length = axis.length();
        let Some(direction) = axis.normalize() else {
            return Err(SbtError::config(
                "geometry",
                format!("zero-length segment at {start} ({role:?})"),
            ));
        };
        let midpoint = Point::midpoint(start, end);
        elements.push(Element {
            role,
            start,
            end,
            midpoint,
            direction,
            length,
            radius,
            flow_share,
            rock_temperature: config.rock.temperature_at(midpoint.depth()),
            outlet_rock_temperature: config.rock.temperature_at(end.depth()),
            rock: config.rock.properties_at(midpoint.depth()),
        });
    }
    Ok(())
}

fn flow_topology(
    injector: &Range<usize>,
    laterals: &[Range<usize>],
    producer: &Range<usize>,
    fractions: &[f64],
) -> Vec<Inlet> {
    let n = producer.end;
    let mut inlets = vec![Inlet::Injection; n];
    for i in injector.clone().skip(1) {
        inlets[i] = Inlet::Single(i - 1);
    }
    for range in laterals {
        inlets[range.start] = Inlet::Single(injector.end - 1);
        for i in range.clone().skip(1) {
            inlets[i] = Inlet::Single(i - 1);
        }
    }
    inlets[producer.start] = if laterals.len() == 1 {
        Inlet::Single(laterals[0].end - 1)
    } else {
        Inlet::Merge(
            laterals
                .iter()
                .zip(fractions)
                .map(|(range, &f)| (range.end - 1, f))
                .collect(),
        )
    };
    for i in producer.clone().skip(1) {
        inlets[i] = Inlet::Single(i - 1);
    }
    inlets
}

fn quality_warnings(elements: &[Element], inlets: &[Inlet]) -> Vec<SimWarning> {
    let mut warnings = Vec::new();
    for (i, e) in elements.iter().enumerate() {
        let ratio = e.length / e.radius;
        if ratio < MIN_SLENDER_RATIO {
            warnings.push(SimWarning::SlenderRatio { element: i, ratio });
        }
        for (j, _) in inlets[i].upstream() {
            let upstream_length = elements[j].length;
            let relative_change = (e.length - upstream_length).abs() / upstream_length;
            if relative_change > MAX_LENGTH_JUMP {
                warnings.push(SimWarning::LengthJump {
                    upstream: j,
                    element: i,
                    relative_change,
                });
            }
        }
    }
    warnings
}

#[derive(Debug, Clone, Copy)]
enum Cutoff {
    /// Far when `spacing / length_i` exceeds the ratio.
    Ratio(f64),
    /// Far beyond a fixed distance.
    Radius(f64),
}

fn sort_neighbors(
    elements: &[Element],
    spacing: &SpacingMatrix,
    cutoff: Cutoff,
) -> Vec<SortedNeighbors> {
    let n = elements.len();
    (0..n)
        .map(|i| {
            let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
            order.sort_by(|&a, &b| spacing.get(i, a).total_cmp(&spacing.get(i, b)).then(a.cmp(&b)));
            let is_near = |j: &usize| match cutoff {
                Cutoff::Ratio(ratio) => spacing.get(i, *j) / elements[i].length <= ratio,
                Cutoff::Radius(radius) => spacing.get(i, *j) <= radius,
            };
            let far_start = order.partition_point(is_near);
            SortedNeighbors { order, far_start }
        })
        .collect()
}
