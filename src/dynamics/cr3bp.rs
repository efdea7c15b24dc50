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

use super::{Dynamics, DynamicsError};
use crate::cosmic::MassRatio;
use crate::linalg::{Matrix6, Vector3, Vector6};
use hyperdual::linalg::norm;
use hyperdual::{extract_jacobian_and_result, hyperspace_from_vector, Float, Hyperdual};
use std::fmt;

/// Distances from the state to the larger (r1) and smaller (r2) primaries.
pub fn primary_distances(state: &Vector6<f64>, mu: MassRatio) -> (f64, f64) {
    let (x, y, z) = (state[0], state[1], state[2]);
    let r1 = ((x + mu.value()).powi(2) + y.powi(2) + z.powi(2)).sqrt();
    let r2 = ((x - mu.primary()).powi(2) + y.powi(2) + z.powi(2)).sqrt();
    (r1, r2)
}

/// Time derivative of a synodic state under the CR3BP equations of motion.
///
/// No checks are performed: states on top of a primary lead to non finite values.
pub fn derivative(state: &Vector6<f64>, mu: MassRatio) -> Vector6<f64> {
    let (x, y, z) = (state[0], state[1], state[2]);
    let (vx, vy, vz) = (state[3], state[4], state[5]);
    let mu1 = mu.primary();
    let mu2 = mu.value();

    let (r1, r2) = primary_distances(state, mu);
    let r1_3 = r1.powi(3);
    let r2_3 = r2.powi(3);
    // Common factor of the y and z accelerations
    let pull = mu1 / r1_3 + mu2 / r2_3;

    Vector6::new(
        vx,
        vy,
        vz,
        x + 2.0 * vy - mu1 * (x + mu2) / r1_3 - mu2 * (x - mu1) / r2_3,
        y - 2.0 * vx - y * pull,
        -z * pull,
    )
}

/// `Cr3bpDynamics` provides the equations of motion of the CR3BP for a given mass ratio.
///
/// The dynamics are autonomous: the time argument of the equations of motion is ignored.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cr3bpDynamics {
    pub mu: MassRatio,
}

impl Cr3bpDynamics {
    pub fn new(mu: MassRatio) -> Self {
        Self { mu }
    }

    /// CR3BP dynamics of the Earth-Moon system
    pub fn earth_moon() -> Self {
        Self::new(MassRatio::earth_moon())
    }
}

impl fmt::Display for Cr3bpDynamics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CR3BP dynamics with {}", self.mu)
    }
}

impl Dynamics for Cr3bpDynamics {
    fn eom(&self, _delta_t: f64, state: &Vector6<f64>) -> Result<Vector6<f64>, DynamicsError> {
        let d_x = derivative(state, self.mu);
        if d_x.iter().all(|v| v.is_finite()) {
            Ok(d_x)
        } else {
            let (r1, r2) = primary_distances(state, self.mu);
            Err(DynamicsError::NonFiniteDerivative { r1, r2 })
        }
    }

    fn dual_eom(
        &self,
        _delta_t: f64,
        state: &Vector6<f64>,
    ) -> Result<(Vector6<f64>, Matrix6<f64>), DynamicsError> {
        // Build full state vector with partials in the right position
        let state_d: Vector6<Hyperdual<f64, 7>> = hyperspace_from_vector(state);

        let (x, y, z) = (state_d[0], state_d[1], state_d[2]);
        let (vx, vy) = (state_d[3], state_d[4]);

        let mu1 = Hyperdual::<f64, 7>::from_real(self.mu.primary());
        let mu2 = Hyperdual::<f64, 7>::from_real(self.mu.value());
        let two = Hyperdual::<f64, 7>::from_real(2.0);

        let r1_3 = norm(&Vector3::new(x + mu2, y, z)).powi(3);
        let r2_3 = norm(&Vector3::new(x - mu1, y, z)).powi(3);
        let pull = mu1 / r1_3 + mu2 / r2_3;

        let d_x_d = Vector6::new(
            state_d[3],
            state_d[4],
            state_d[5],
            x + two * vy - mu1 * (x + mu2) / r1_3 - mu2 * (x - mu1) / r2_3,
            y - two * vx - y * pull,
            -(z * pull),
        );

        let (d_x, grad) = extract_jacobian_and_result::<_, 6, 6, 7>(&d_x_d);

        if d_x.iter().chain(grad.iter()).all(|v| v.is_finite()) {
            Ok((d_x, grad))
        } else {
            let (r1, r2) = primary_distances(state, self.mu);
            Err(DynamicsError::NonFiniteDerivative { r1, r2 })
        }
    }
}
