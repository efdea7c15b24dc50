/*
    CR3BP validator, consistency checks for Earth-Moon periodic orbits
    Copyright (C) 2024 Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::io::ConfigError;
use crate::propagators::PropagationError;
use crate::validation::ReportError;
use snafu::prelude::*;

/// Errors raised while validating trajectories.
///
/// Input mistakes (`InvalidInput`, `ShapeMismatch`, `NonMonotonicTime`, `UnknownErrorKind`) are kept apart from
/// numerical method failures (`IntegrationFailure`) so callers can tell whether to fix the inputs or to inspect
/// the trajectory itself.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CheckError {
    /// Wrong vector or trajectory length, or an out of range scalar.
    #[snafu(display("invalid input: {msg}"))]
    InvalidInput { msg: String },
    /// Number of components is not one of those accepted by the requested operation.
    #[snafu(display("expected {expected} components but got {got}"))]
    ShapeMismatch { expected: &'static str, got: usize },
    /// Time axis of an orbit is not strictly increasing.
    #[snafu(display(
        "time vector of orbit #{orbit} is not strictly increasing at sample {index}: {prev} then {next}"
    ))]
    NonMonotonicTime {
        orbit: usize,
        index: usize,
        prev: f64,
        next: f64,
    },
    /// Error kind is not one of position, velocity or energy.
    #[snafu(display("unknown error kind `{kind}`, choose from position, velocity or energy"))]
    UnknownErrorKind { kind: String },
    /// The adaptive integrator could not reach the requested time.
    #[snafu(display("integration failed: {source}"))]
    IntegrationFailure { source: PropagationError },
    #[snafu(display("configuration error: {source}"))]
    Config { source: ConfigError },
    #[snafu(display("reporting sink failed: {source}"))]
    Report { source: ReportError },
}

impl From<PropagationError> for CheckError {
    fn from(source: PropagationError) -> Self {
        Self::IntegrationFailure { source }
    }
}

impl From<ConfigError> for CheckError {
    fn from(source: ConfigError) -> Self {
        Self::Config { source }
    }
}
