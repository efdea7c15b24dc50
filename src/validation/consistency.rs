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

use snafu::ensure;

use super::{Trajectory, TIMED_STATE_SIZE};
use crate::cosmic::{jacobi_constant, MassRatio};
use crate::errors::{InvalidInputSnafu, ShapeMismatchSnafu};
use crate::propagators::{propagate_with, ErrorCtrl, PropOpts, WeightedRmsStep};
use crate::utils::rss_state_errors;
use crate::CheckError;

/// Position and velocity residual norms between a re-propagated state and the recorded one.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StepDefect {
    pub position: f64,
    pub velocity: f64,
}

impl fmt::Display for StepDefect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pos: {:.6e}, vel: {:.6e}", self.position, self.velocity)
    }
}

/// Computes the energy drift and the dynamical defect of individual trajectories.
///
/// The checker holds no state between calls: every pair of samples is re-propagated by its own propagation instance.
#[derive(Clone, Debug)]
pub struct ConsistencyChecker<E: ErrorCtrl> {
    pub mu: MassRatio,
    pub opts: PropOpts<E>,
}

impl ConsistencyChecker<WeightedRmsStep> {
    /// A checker with the default propagator options (both tolerances at 1e-8).
    pub fn new(mu: MassRatio) -> Self {
        Self::with_opts(mu, PropOpts::default())
    }
}

impl<E: ErrorCtrl> ConsistencyChecker<E> {
    pub fn with_opts(mu: MassRatio, opts: PropOpts<E>) -> Self {
        Self { mu, opts }
    }

    /// Returns the Jacobi constant of each sample of a six or seven component trajectory.
    fn jacobi_constants(&self, traj: &Trajectory) -> Result<Vec<f64>, CheckError> {
        ensure!(
            !traj.is_empty(),
            InvalidInputSnafu {
                msg: "cannot compute the energy of an empty trajectory"
            }
        );
        Ok(traj
            .states()?
            .iter()
            .map(|state| jacobi_constant(state, self.mu).jacobi)
            .collect())
    }

    /// Sum over all samples of the deviation of the Jacobi constant from the one of the first sample.
    ///
    /// The time of a seven component trajectory is ignored.
    pub fn energy_drift(&self, traj: &Trajectory) -> Result<f64, CheckError> {
        let jacobis = self.jacobi_constants(traj)?;
        let j0 = jacobis[0];
        Ok(jacobis.iter().map(|ji| (j0 - ji).abs()).sum())
    }

    /// Deviation of the Jacobi constant between each pair of consecutive samples.
    pub fn energy_steps(&self, traj: &Trajectory) -> Result<Vec<f64>, CheckError> {
        let jacobis = self.jacobi_constants(traj)?;
        Ok(jacobis
            .windows(2)
            .map(|pair| (pair[0] - pair[1]).abs())
            .collect())
    }

    /// Re-propagates each sample until the time of the next one and returns the residuals against the next sample.
    ///
    /// The trajectory must have seven components, the first being the time.
    pub fn dynamics_defect_steps(&self, traj: &Trajectory) -> Result<Vec<StepDefect>, CheckError> {
        ensure!(
            traj.components() == TIMED_STATE_SIZE,
            ShapeMismatchSnafu {
                expected: "7",
                got: traj.components(),
            }
        );
        ensure!(
            !traj.is_empty(),
            InvalidInputSnafu {
                msg: "cannot compute the dynamical defect of an empty trajectory"
            }
        );

        let data = traj.data();
        let mut defects = Vec::with_capacity(traj.len() - 1);
        for i in 0..traj.len() - 1 {
            let dt = data[(0, i + 1)] - data[(0, i)];
            let propagated = propagate_with(&traj.state(i), dt, self.mu, &self.opts)?;
            let (position, velocity) = rss_state_errors(&propagated, &traj.state(i + 1));
            trace!("sample {i} -> {}: dt = {dt}, {position:e} {velocity:e}", i + 1);
            defects.push(StepDefect { position, velocity });
        }
        Ok(defects)
    }

    /// Cumulative position and velocity residual norms over all consecutive pairs of samples.
    pub fn dynamics_defect(&self, traj: &Trajectory) -> Result<(f64, f64), CheckError> {
        let defects = self.dynamics_defect_steps(traj)?;
        Ok((
            defects.iter().map(|d| d.position).sum(),
            defects.iter().map(|d| d.velocity).sum(),
        ))
    }
}

/// Cumulative deviation of the Jacobi constant of a six or seven component trajectory from its first sample.
pub fn energy_drift(traj: &Trajectory, mu: MassRatio) -> Result<f64, CheckError> {
    ConsistencyChecker::new(mu).energy_drift(traj)
}

/// Cumulative position and velocity residuals of a seven component trajectory re-propagated pair by pair with the
/// default tolerances.
pub fn dynamics_defect(traj: &Trajectory, mu: MassRatio) -> Result<(f64, f64), CheckError> {
    ConsistencyChecker::new(mu).dynamics_defect(traj)
}
