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

use std::fmt;
use std::str::FromStr;

use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};

use crate::errors::UnknownErrorKindSnafu;
use crate::CheckError;

mod trajectory;
pub use trajectory::*;

mod consistency;
pub use consistency::*;

mod aggregate;
pub use aggregate::*;

/// Reporting sinks which consume the per time step error evolution of an aggregation.
pub mod report;
pub use report::{CsvSink, LogSink, ReportError, ReportSink};

/// Category of error computed by the aggregator.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Norm of the position residual after re-propagation
    Position,
    /// Norm of the velocity residual after re-propagation
    Velocity,
    /// Deviation of the Jacobi constant
    Energy,
}

impl ErrorKind {
    /// Returns the lowercase label of this kind, as used in configuration files and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::Energy => "energy",
        }
    }

    /// Whether this kind is computed from the dynamical defect (re-propagation of each pair of samples)
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Position | Self::Velocity)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ErrorKind {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "position" => Ok(Self::Position),
            "velocity" => Ok(Self::Velocity),
            "energy" => Ok(Self::Energy),
            _ => UnknownErrorKindSnafu { kind: s.to_string() }.fail(),
        }
    }
}
