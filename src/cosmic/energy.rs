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

use super::MassRatio;
use crate::errors::{CheckError, InvalidInputSnafu};
use crate::linalg::Vector6;
use snafu::ensure;
use std::fmt;

/// Energy of a synodic state: the Jacobi constant and the total energy, related by `J = -2E`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JacobiEnergy {
    pub jacobi: f64,
    pub energy: f64,
}

impl fmt::Display for JacobiEnergy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "J = {:.12}, E = {:.12}", self.jacobi, self.energy)
    }
}

/// Computes the Jacobi constant and total energy of the provided state, which must have exactly six components.
///
/// The effective potential includes the constant `-mu(1-mu)/2` term, so the Jacobi constants differ from the
/// JPL periodic orbit database by `mu(1-mu)`.
pub fn jacobi(state: &[f64], mu: MassRatio) -> Result<JacobiEnergy, CheckError> {
    ensure!(
        state.len() == 6,
        InvalidInputSnafu {
            msg: format!("state vector must have 6 components but has {}", state.len())
        }
    );
    Ok(jacobi_constant(&Vector6::from_column_slice(state), mu))
}

/// Jacobi constant and total energy of a synodic state vector.
pub fn jacobi_constant(state: &Vector6<f64>, mu: MassRatio) -> JacobiEnergy {
    let (x, y, z) = (state[0], state[1], state[2]);
    let mu1 = mu.primary();
    let mu2 = mu.value();

    let r1 = ((x + mu2).powi(2) + y.powi(2) + z.powi(2)).sqrt();
    let r2 = ((x - mu1).powi(2) + y.powi(2) + z.powi(2)).sqrt();

    let kinetic = 0.5 * state.fixed_rows::<3>(3).norm_squared();
    let potential = -0.5 * (x.powi(2) + y.powi(2)) - mu1 / r1 - mu2 / r2 - 0.5 * mu1 * mu2;

    let energy = kinetic + potential;

    JacobiEnergy {
        jacobi: -2.0 * energy,
        energy,
    }
}
