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

use crate::errors::{CheckError, InvalidInputSnafu};
use crate::linalg::Vector3;
use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::convert::TryFrom;
use std::fmt;

mod energy;
pub use energy::*;

/// Mass ratio of the Earth-Moon system, as used to generate the periodic orbit datasets.
///
/// This is a caller side convenience: nothing in the algorithms defaults to it.
pub const EARTH_MOON_MU: f64 = 0.0122;

/// Mass ratio `mu` of a CR3BP, i.e. the mass of the smaller primary over the total mass of the system.
///
/// The value is guaranteed to be within the open interval (0, 1). It is passed explicitly to every computation.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct MassRatio(f64);

impl MassRatio {
    /// Builds a new mass ratio, which must be strictly between zero and one.
    pub fn new(mu: f64) -> Result<Self, CheckError> {
        ensure!(
            mu > 0.0 && mu < 1.0,
            InvalidInputSnafu {
                msg: format!("mass ratio must be within (0, 1) but got {mu}")
            }
        );
        Ok(Self(mu))
    }

    /// The Earth-Moon mass ratio of the periodic orbit datasets
    pub fn earth_moon() -> Self {
        Self(EARTH_MOON_MU)
    }

    /// Returns the raw value of this mass ratio
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Returns 1 - mu, the mass fraction of the larger primary
    pub fn primary(&self) -> f64 {
        1.0 - self.0
    }
}

impl TryFrom<f64> for MassRatio {
    type Error = CheckError;

    fn try_from(mu: f64) -> Result<Self, Self::Error> {
        Self::new(mu)
    }
}

impl From<MassRatio> for f64 {
    fn from(mu: MassRatio) -> Self {
        mu.0
    }
}

impl fmt::Display for MassRatio {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "mu = {}", self.0)
    }
}

/// Reference locations of the Earth-Moon synodic frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence)]
pub enum LagrangePoint {
    Earth,
    Moon,
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl LagrangePoint {
    /// Position of this point in the synodic frame, in non-dimensional units.
    ///
    /// The primaries are placed exactly from `mu`. The libration points use the tabulated Earth-Moon values, which
    /// are only meaningful for mass ratios close to [`EARTH_MOON_MU`].
    pub fn position(&self, mu: MassRatio) -> Vector3<f64> {
        match self {
            Self::Earth => Vector3::new(-mu.value(), 0.0, 0.0),
            Self::Moon => Vector3::new(mu.primary(), 0.0, 0.0),
            Self::L1 => Vector3::new(0.8369, 0.0, 0.0),
            Self::L2 => Vector3::new(1.1557, 0.0, 0.0),
            Self::L3 => Vector3::new(-1.0051, 0.0, 0.0),
            Self::L4 => Vector3::new(0.4879, 0.8660, 0.0),
            Self::L5 => Vector3::new(0.4879, -0.8660, 0.0),
        }
    }

    /// Whether this point is one of the two primaries (where the dynamics are singular)
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Earth | Self::Moon)
    }
}

impl fmt::Display for LagrangePoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Earth => write!(f, "Earth"),
            Self::Moon => write!(f, "Moon"),
            Self::L1 => write!(f, "Lagrange 1"),
            Self::L2 => write!(f, "Lagrange 2"),
            Self::L3 => write!(f, "Lagrange 3"),
            Self::L4 => write!(f, "Lagrange 4"),
            Self::L5 => write!(f, "Lagrange 5"),
        }
    }
}
