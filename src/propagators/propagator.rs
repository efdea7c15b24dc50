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

use super::error_ctrl::{ErrorCtrl, WeightedRmsStep};
use super::{IntegrationDetails, PropInstance, PropOpts, PropagationError};
use crate::cosmic::MassRatio;
use crate::dynamics::{Cr3bpDynamics, Dynamics};
use crate::linalg::Vector6;

/// A Propagator allows propagating a set of dynamics forward or backward in time.
///
/// It stores the dynamics and the integration options. Each call to [`Propagator::with`] creates an independent
/// [`PropInstance`]: no solver state is shared between instances, so one setup may be used from several threads.
#[derive(Clone, Debug)]
pub struct Propagator<D: Dynamics, E: ErrorCtrl> {
    pub dynamics: D, // Stores the dynamics used. *Must* use this to get the latest values
    pub opts: PropOpts<E>, // Stores the integration options (tolerances, step limits, budgets)
}

impl<D: Dynamics, E: ErrorCtrl> Propagator<D, E> {
    /// A Radau IIA propagator with custom propagator options.
    pub fn new(dynamics: D, opts: PropOpts<E>) -> Self {
        Self { dynamics, opts }
    }

    /// Set the tolerances for the propagator
    pub fn set_tolerances(&mut self, rtol: f64, atol: f64) {
        self.opts.tolerances.rtol = rtol;
        self.opts.tolerances.atol = atol;
    }

    /// Set the maximum step size for the propagator and clamps the initial step to that value if currently greater
    pub fn set_max_step(&mut self, step: f64) {
        self.opts.set_max_step(step);
    }

    /// Initializes a propagation instance at time zero from the provided state.
    pub fn with(&self, state: Vector6<f64>) -> PropInstance<'_, D, E> {
        PropInstance {
            state,
            t: 0.0,
            prop: self,
            details: IntegrationDetails::default(),
            step_size: self.opts.init_step,
            steps: 0,
        }
    }
}

impl<D: Dynamics> Propagator<D, WeightedRmsStep> {
    /// Default propagator is a Radau IIA with the default PropOpts.
    pub fn default(dynamics: D) -> Self {
        Self::new(dynamics, PropOpts::default())
    }
}

/// Propagates a synodic state by `dt` (negative for backward propagation) under the CR3BP with the provided
/// mass ratio, with the default relative and absolute tolerances of 1e-8. Returns only the final state.
pub fn propagate(
    state0: &Vector6<f64>,
    dt: f64,
    mu: MassRatio,
) -> Result<Vector6<f64>, PropagationError> {
    propagate_with(state0, dt, mu, &PropOpts::default())
}

/// Same as [`propagate`] with custom propagator options.
pub fn propagate_with<E: ErrorCtrl>(
    state0: &Vector6<f64>,
    dt: f64,
    mu: MassRatio,
    opts: &PropOpts<E>,
) -> Result<Vector6<f64>, PropagationError> {
    Propagator::new(Cr3bpDynamics::new(mu), *opts)
        .with(*state0)
        .for_duration(dt)
}
