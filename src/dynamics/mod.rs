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

use crate::linalg::{Matrix6, Vector6};
use snafu::Snafu;

/// Equations of motion of the Circular Restricted Three-Body Problem in the synodic frame.
pub mod cr3bp;
pub use self::cr3bp::*;

/// A trait for models with equations of motion that can be integrated.
///
/// The state is a synodic Cartesian state (x, y, z, vx, vy, vz) in non-dimensional units.
pub trait Dynamics: Clone + Sync + Send {
    /// Defines the equations of motion.
    ///
    /// - `delta_t`: Non-dimensional time past the start of the propagation, unused by autonomous dynamics.
    /// - `state`: The state vector, which changes at each integration stage.
    fn eom(&self, delta_t: f64, state: &Vector6<f64>) -> Result<Vector6<f64>, DynamicsError>;

    /// Defines the equations of motion and their Jacobian with respect to the state.
    ///
    /// Implicit integrators require the Jacobian for their Newton iteration. Dynamics which cannot provide it
    /// return `JacobianUnavailable`.
    fn dual_eom(
        &self,
        _delta_t: f64,
        _state: &Vector6<f64>,
    ) -> Result<(Vector6<f64>, Matrix6<f64>), DynamicsError> {
        Err(DynamicsError::JacobianUnavailable)
    }
}

/// Dynamical model errors.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    /// Jacobian of the equations of motion was requested but is not implemented.
    #[snafu(display("these dynamics do not provide a Jacobian"))]
    JacobianUnavailable,
    /// Equations of motion evaluated to a non finite value.
    #[snafu(display("equations of motion are not finite at r1 = {r1}, r2 = {r2}"))]
    NonFiniteDerivative { r1: f64, r2: f64 },
}
