//! Error and warning taxonomy of a simulation run.
//!
//! Every [`SbtError`] is fatal: it unwinds to the caller and the run produces
//! no result. [`SimWarning`]s are logged when raised and collected in the
//! result, but never change control flow.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which end of a lateral failed to connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LateralEnd {
    /// First point, expected at the injector's terminal point.
    Start,
    /// Last point, expected at the producer's initial point.
    End,
}

impl fmt::Display for LateralEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LateralEnd::Start => write!(f, "start (injector junction)"),
            LateralEnd::End => write!(f, "end (producer junction)"),
        }
    }
}

/// Why a flow-rate or injection-temperature profile was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileIssue {
    #[error("first time must be exactly 0 s, found {found} s")]
    FirstTimeNotZero { found: f64 },
    #[error("last time must equal the simulation horizon {expected} s, found {found} s")]
    LastTimeMismatch { expected: f64, found: f64 },
    #[error("at least two data points are required, found {found}")]
    TooFewPoints { found: usize },
    #[error("times must be strictly increasing (row {row})")]
    NonIncreasing { row: usize },
    #[error("cannot parse row {row}: '{line}'")]
    Parse { row: usize, line: String },
}

/// Fatal simulation errors.
#[derive(Debug, Error)]
pub enum SbtError {
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("lateral {lateral} {end} is {distance:.4} m away from the well path")]
    GeometryMismatch {
        lateral: usize,
        end: LateralEnd,
        distance: f64,
    },

    #[error("lateral flow fractions: expected {expected} values, found {found}")]
    FlowFractionMismatch { expected: usize, found: usize },

    #[error("{profile} profile: {issue}")]
    ProfileValidation {
        profile: String,
        issue: ProfileIssue,
    },

    #[error("failed to read {profile} profile from {}", .path.display())]
    ProfileIo {
        profile: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("linear solve failed at step {step}{}: {reason}", element_suffix(.element))]
    LinearAlgebra {
        step: usize,
        element: Option<usize>,
        reason: String,
    },
}

fn element_suffix(element: &Option<usize>) -> String {
    element
        .map(|e| format!(" (element {e})"))
        .unwrap_or_default()
}

impl SbtError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        SbtError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Non-fatal conditions raised during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SimWarning {
    /// Element is short compared to its radius.
    SlenderRatio { element: usize, ratio: f64 },
    /// Abrupt length change between an element and its upstream element.
    LengthJump {
        upstream: usize,
        element: usize,
        relative_change: f64,
    },
    /// Fluid temperature at or above the boiling-point proxy.
    PhysicalLimit {
        step: usize,
        element: usize,
        temperature: f64,
    },
}

impl SimWarning {
    /// Geometry warnings are raised by discretization, physical ones while stepping.
    pub fn is_geometry_quality(&self) -> bool {
        !matches!(self, SimWarning::PhysicalLimit { .. })
    }

    /// Emits the warning through `tracing`.
    pub(crate) fn log(&self) {
        tracing::warn!("{self}");
    }
}

impl fmt::Display for SimWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimWarning::SlenderRatio { element, ratio } => write!(
                f,
                "element {element}: length/radius ratio {ratio:.2} is below 10, \
                 numerical instability is likely"
            ),
            SimWarning::LengthJump {
                upstream,
                element,
                relative_change,
            } => write!(
                f,
                "elements {upstream} -> {element}: length changes by {:.0}% (more than 60%)",
                relative_change * 100.0
            ),
            SimWarning::PhysicalLimit {
                step,
                element,
                temperature,
            } => write!(
                f,
                "step {step}: fluid temperature {temperature:.1} C at element {element} \
                 reached the 100 C boiling-point proxy"
            ),
        }
    }
}
