//! Time profiles for the flow rate and the injection temperature.
//!
//! A profile is either a constant, an inline `[time, value]` series, or a
//! two-column text file. Tabulated profiles must cover the simulation horizon
//! exactly: the first time is 0 s and the last time is the horizon.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::{ProfileIssue, SbtError};
use crate::vecutils;

/// Relative tolerance for matching the last profile time to the horizon.
const HORIZON_RTOL: f64 = 1e-9;

/// How a profile is specified in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    Constant(f64),
    /// Rows of `[time_s, value]`.
    Series(Vec<[f64; 2]>),
    /// Two-column text file with `time_s, value` rows.
    File(PathBuf),
}

/// Validated profile, ready for lookups.
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Constant(f64),
    Table { times: Vec<f64>, values: Vec<f64> },
}

impl ProfileSource {
    /// Loads (if needed) and validates the profile against the horizon (s).
    ///
    /// `name` labels the profile in error messages.
    pub fn resolve(&self, name: &str, horizon: f64) -> Result<Profile, SbtError> {
        let rows = match self {
            ProfileSource::Constant(value) => {
                if !value.is_finite() {
                    return Err(SbtError::ProfileValidation {
                        profile: name.to_string(),
                        issue: ProfileIssue::Parse {
                            row: 0,
                            line: value.to_string(),
                        },
                    });
                }
                return Ok(Profile::Constant(*value));
            }
            ProfileSource::Series(rows) => rows.clone(),
            ProfileSource::File(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| SbtError::ProfileIo {
                        profile: name.to_string(),
                        path: path.clone(),
                        source,
                    })?;
                parse_rows(&content).map_err(|issue| SbtError::ProfileValidation {
                    profile: name.to_string(),
                    issue,
                })?
            }
        };

        validate_rows(&rows, horizon).map_err(|issue| SbtError::ProfileValidation {
            profile: name.to_string(),
            issue,
        })?;

        let (times, values) = rows.iter().map(|r| (r[0], r[1])).unzip();
        Ok(Profile::Table { times, values })
    }
}

impl Profile {
    /// Value at time `t` (s), linearly interpolated between rows.
    pub fn value_at(&self, t: f64) -> f64 {
        match self {
            Profile::Constant(value) => *value,
            Profile::Table { times, values } => vecutils::interp(times, values, t),
        }
    }

    /// Source equivalent of this profile, with file contents inlined.
    pub fn to_source(&self) -> ProfileSource {
        match self {
            Profile::Constant(value) => ProfileSource::Constant(*value),
            Profile::Table { times, values } => ProfileSource::Series(
                times.iter().zip(values).map(|(&t, &v)| [t, v]).collect(),
            ),
        }
    }
}

/// Parses a two-column profile file.
///
/// Columns may be separated by a comma or whitespace. Blank lines and lines
/// starting with `#` are skipped, and a single non-numeric header line is
/// accepted before the first data row. Row numbers are 1-based file lines.
pub fn parse_rows(content: &str) -> Result<Vec<[f64; 2]>, ProfileIssue> {
    let mut rows = Vec::new();
    let mut header_seen = false;

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_row(line) {
            Some(row) => rows.push(row),
            None if rows.is_empty() && !header_seen => header_seen = true,
            None => {
                return Err(ProfileIssue::Parse {
                    row: i + 1,
                    line: line.to_string(),
                });
            }
        }
    }
    Ok(rows)
}

fn parse_row(line: &str) -> Option<[f64; 2]> {
    let mut fields = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty());
    let t = fields.next()?.parse::<f64>().ok()?;
    let v = fields.next()?.parse::<f64>().ok()?;
    if fields.next().is_some() || !t.is_finite() || !v.is_finite() {
        return None;
    }
    Some([t, v])
}

/// Checks that the rows span `[0, horizon]` with strictly increasing times.
pub fn validate_rows(rows: &[[f64; 2]], horizon: f64) -> Result<(), ProfileIssue> {
    if rows.len() < 2 {
        return Err(ProfileIssue::TooFewPoints { found: rows.len() });
    }
    let first = rows[0][0];
    if first != 0.0 {
        return Err(ProfileIssue::FirstTimeNotZero { found: first });
    }
    if let Some(row) = rows.windows(2).position(|w| !(w[1][0] > w[0][0])) {
        return Err(ProfileIssue::NonIncreasing { row: row + 1 });
    }
    let last = rows[rows.len() - 1][0];
    if (last - horizon).abs() > HORIZON_RTOL * horizon.abs() {
        return Err(ProfileIssue::LastTimeMismatch {
            expected: horizon,
            found: last,
        });
    }
    Ok(())
}
